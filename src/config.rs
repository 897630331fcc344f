//! # Sample Configuration
//!
//! Settings loaded from environment variables (optionally seeded from a
//! `.env` file by the binary). The resulting [`SampleConfig`] is passed
//! explicitly to the client and the scenario runner.

use crate::constants::*;
use crate::error::ConfigError;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::warn;
use zeroize::Zeroizing;

/// Key Vault naming rules: 3-24 characters, alphanumerics and hyphens,
/// starts with a letter, ends with a letter or digit.
static VAULT_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9-]{1,22}[a-zA-Z0-9]$")
        .expect("vault name pattern is a valid regex")
});

/// How the management API token is obtained
#[derive(Clone)]
pub enum AuthConfig {
    /// Managed Identity (works automatically in Azure-hosted environments)
    ManagedIdentity,
    /// Workload Identity federation for the given client id
    WorkloadIdentity { client_id: String },
    /// Client-credential flow for a service principal
    ServicePrincipal {
        client_id: String,
        client_secret: Zeroizing<String>,
    },
    /// Pre-acquired bearer token (e.g. `az account get-access-token`)
    StaticToken(Zeroizing<String>),
    /// Dummy token for contract tests against a mock server
    Mock,
}

impl AuthConfig {
    /// Label used in logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ManagedIdentity => "managed_identity",
            Self::WorkloadIdentity { .. } => "workload_identity",
            Self::ServicePrincipal { .. } => "client_secret",
            Self::StaticToken(_) => "static_token",
            Self::Mock => "mock",
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManagedIdentity => f.write_str("ManagedIdentity"),
            Self::WorkloadIdentity { client_id } => f
                .debug_struct("WorkloadIdentity")
                .field("client_id", client_id)
                .finish(),
            Self::ServicePrincipal { client_id, .. } => f
                .debug_struct("ServicePrincipal")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Self::StaticToken(_) => f.write_str("StaticToken(..)"),
            Self::Mock => f.write_str("Mock"),
        }
    }
}

/// Bounds for a poll-with-backoff loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// First (and second) delay between polls
    pub min_interval: Duration,
    /// Largest delay between polls
    pub max_interval: Duration,
    /// Total time allowed before giving up
    pub timeout: Duration,
}

impl PollConfig {
    #[must_use]
    pub fn new(min_interval: Duration, max_interval: Duration, timeout: Duration) -> Self {
        Self {
            min_interval,
            max_interval,
            timeout,
        }
    }
}

/// Readiness wait applied after vault creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessConfig {
    pub poll: PollConfig,
    /// Also wait until the vault URI host resolves in DNS
    pub check_dns: bool,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::new(
                Duration::from_millis(DEFAULT_READINESS_MIN_INTERVAL_MS),
                Duration::from_millis(DEFAULT_READINESS_MAX_INTERVAL_MS),
                Duration::from_secs(DEFAULT_READINESS_TIMEOUT_SECS),
            ),
            check_dns: false,
        }
    }
}

/// Everything the scenarios need to know about their target environment
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub subscription_id: String,
    pub tenant_id: String,
    /// Object id of the principal running the sample; granted an access policy when set
    pub object_id: Option<String>,
    pub resource_group: String,
    pub vault_name: String,
    pub location: String,
    pub management_endpoint: String,
    pub auth: AuthConfig,
    pub readiness: ReadinessConfig,
    /// Long-running operation polling
    pub operation: PollConfig,
    pub http_timeout: Duration,
}

impl SampleConfig {
    /// Create a configuration with defaults for everything but the identifiers
    pub fn new(
        subscription_id: impl Into<String>,
        tenant_id: impl Into<String>,
        resource_group: impl Into<String>,
        vault_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            tenant_id: tenant_id.into(),
            object_id: None,
            resource_group: resource_group.into(),
            vault_name: vault_name.into(),
            location: DEFAULT_LOCATION.to_string(),
            management_endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            auth: AuthConfig::ManagedIdentity,
            readiness: ReadinessConfig::default(),
            operation: PollConfig::new(
                Duration::from_millis(DEFAULT_OPERATION_MIN_INTERVAL_MS),
                Duration::from_millis(DEFAULT_OPERATION_MAX_INTERVAL_MS),
                Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS),
            ),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    /// Load configuration from the process environment
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or a value is invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or a value is invalid
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let mut config = Self::new(
            required("AZURE_SUBSCRIPTION_ID")?,
            required("AZURE_TENANT_ID")?,
            required("AZURE_RESOURCE_GROUP")?,
            required("AZURE_VAULT_NAME")?,
        );

        config.object_id = get("AZURE_OBJECT_ID");
        if let Some(location) = get("AZURE_LOCATION") {
            config.location = location;
        }
        if let Some(endpoint) = get("AZURE_MANAGEMENT_ENDPOINT") {
            config.management_endpoint = endpoint.trim_end_matches('/').to_string();
        }

        let pact_mode = get("PACT_MODE").is_some();
        config.auth = if pact_mode {
            AuthConfig::Mock
        } else if let Some(token) = get("AZURE_ACCESS_TOKEN") {
            AuthConfig::StaticToken(Zeroizing::new(token))
        } else if let (Some(client_id), Some(client_secret)) =
            (get("AZURE_CLIENT_ID"), get("AZURE_CLIENT_SECRET"))
        {
            AuthConfig::ServicePrincipal {
                client_id,
                client_secret: Zeroizing::new(client_secret),
            }
        } else if let (Some(client_id), Some(_)) =
            (get("AZURE_CLIENT_ID"), get("AZURE_FEDERATED_TOKEN_FILE"))
        {
            AuthConfig::WorkloadIdentity { client_id }
        } else {
            AuthConfig::ManagedIdentity
        };

        config.readiness = ReadinessConfig {
            poll: PollConfig::new(
                Duration::from_millis(parse_or(
                    &get,
                    "READINESS_MIN_INTERVAL_MS",
                    DEFAULT_READINESS_MIN_INTERVAL_MS,
                )?),
                Duration::from_millis(parse_or(
                    &get,
                    "READINESS_MAX_INTERVAL_MS",
                    DEFAULT_READINESS_MAX_INTERVAL_MS,
                )?),
                Duration::from_secs(parse_or(
                    &get,
                    "READINESS_TIMEOUT_SECS",
                    DEFAULT_READINESS_TIMEOUT_SECS,
                )?),
            ),
            check_dns: parse_or(&get, "READINESS_CHECK_DNS", false)?,
        };
        config.operation = PollConfig::new(
            Duration::from_millis(parse_or(
                &get,
                "OPERATION_MIN_INTERVAL_MS",
                DEFAULT_OPERATION_MIN_INTERVAL_MS,
            )?),
            Duration::from_millis(parse_or(
                &get,
                "OPERATION_MAX_INTERVAL_MS",
                DEFAULT_OPERATION_MAX_INTERVAL_MS,
            )?),
            Duration::from_secs(parse_or(
                &get,
                "OPERATION_TIMEOUT_SECS",
                DEFAULT_OPERATION_TIMEOUT_SECS,
            )?),
        );

        config.validate()?;
        if pact_mode {
            validate_mock_endpoint(&config.management_endpoint)?;
        }
        Ok(config)
    }

    /// Check identifiers against the provider's naming rules
    ///
    /// # Errors
    /// Returns an error describing the first invalid value
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_vault_name(&self.vault_name)?;
        if self.resource_group.len() > 90 {
            return Err(ConfigError::Invalid {
                key: "AZURE_RESOURCE_GROUP",
                reason: "resource group names are limited to 90 characters".to_string(),
            });
        }
        if self.location.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                key: "AZURE_LOCATION",
                reason: format!(
                    "'{}' is a display name; use the programmatic region name (e.g. eastus)",
                    self.location
                ),
            });
        }
        Ok(())
    }

    /// Token scope for the configured management endpoint
    #[must_use]
    pub fn token_scope(&self) -> String {
        format!("{}/.default", self.management_endpoint.trim_end_matches('/'))
    }
}

/// Validate a Key Vault name
///
/// # Errors
/// Returns `ConfigError::Invalid` when the name breaks the provider's naming rules
pub fn validate_vault_name(name: &str) -> Result<(), ConfigError> {
    if !VAULT_NAME_PATTERN.is_match(name) || name.contains("--") {
        return Err(ConfigError::Invalid {
            key: "AZURE_VAULT_NAME",
            reason: format!(
                "'{name}' must be 3-24 characters of letters, digits and single hyphens, \
                starting with a letter and ending with a letter or digit"
            ),
        });
    }
    Ok(())
}

/// Refuse to run contract-test mode against production Azure
fn validate_mock_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    if endpoint.contains("management.azure.com") {
        return Err(ConfigError::Invalid {
            key: "AZURE_MANAGEMENT_ENDPOINT",
            reason: format!(
                "PACT_MODE enabled but endpoint '{endpoint}' points to production Azure. \
                Use a mock server endpoint instead."
            ),
        });
    }

    let looks_like_mock = endpoint.starts_with("http://localhost")
        || endpoint.starts_with("http://127.0.0.1")
        || endpoint.starts_with("http://[::1]")
        || endpoint.contains("host.docker.internal")
        || endpoint.contains("pact")
        || endpoint.contains("mock");
    if !looks_like_mock {
        warn!(
            endpoint,
            "PACT_MODE enabled but endpoint does not appear to be a mock server"
        );
    }
    Ok(())
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
