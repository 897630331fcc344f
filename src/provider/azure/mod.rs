//! # Azure Resource Manager Client
//!
//! Native REST implementation of [`VaultManagement`](crate::provider::VaultManagement)
//! against the Azure Resource Manager management plane.
//! Uses reqwest for HTTP requests and an `azure_core` `TokenCredential` for authentication.
//!
//! This implementation:
//! - Works directly with Pact HTTP mock servers (`PACT_MODE`)
//! - Uses reqwest with rustls (no OpenSSL dependencies)
//! - Blocks each mutation until its long-running operation is terminal
//!
//! References:
//! - [Key Vault management REST API](https://learn.microsoft.com/en-us/rest/api/keyvault/keyvault/vaults)
//! - [Resource Groups REST API](https://learn.microsoft.com/en-us/rest/api/resources/resource-groups)

pub mod credential;
mod operations;
pub mod polling;

use crate::config::{PollConfig, SampleConfig};
use crate::error::ClientError;
use azure_core::credentials::{TokenCredential, TokenRequestOptions};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

pub use credential::build_credential;

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
struct ArmErrorResponse {
    error: ArmErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ArmErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Azure Resource Manager REST client
pub struct ArmClient {
    http_client: Client,
    endpoint: String,
    subscription_id: String,
    credential: Arc<dyn TokenCredential>,
    scope: String,
    poll: PollConfig,
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.endpoint)
            .field("subscription_id", &self.subscription_id)
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

impl ArmClient {
    /// Create a client authenticating with the configured credential
    ///
    /// # Errors
    /// Returns an error if the credential or the HTTP client cannot be built
    pub fn new(config: &SampleConfig) -> Result<Self, ClientError> {
        let credential = build_credential(config)?;
        Self::with_credential(config, credential)
    }

    /// Create a client with an explicit credential
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn with_credential(
        config: &SampleConfig,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, ClientError> {
        let endpoint = config.management_endpoint.trim_end_matches('/').to_string();
        info!(
            "Initializing Azure Resource Manager client for subscription: {}",
            config.subscription_id
        );
        if matches!(config.auth, crate::config::AuthConfig::Mock) {
            info!("Pact mode enabled: using endpoint {}", endpoint);
        }

        let http_client = Client::builder().timeout(config.http_timeout).build()?;

        Ok(Self {
            http_client,
            endpoint,
            subscription_id: config.subscription_id.clone(),
            credential,
            scope: config.token_scope(),
            poll: config.operation,
        })
    }

    /// Absolute URL for a path relative to the management endpoint
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn bearer_token(&self) -> Result<String, ClientError> {
        let token = self
            .credential
            .get_token(&[self.scope.as_str()], Some(TokenRequestOptions::default()))
            .await
            .map_err(|e| ClientError::Credential(e.to_string()))?;
        Ok(token.token.secret().to_string())
    }

    /// Build an authenticated request
    ///
    /// `api_version` is appended as a query parameter; poll URLs handed out by
    /// the service already carry one and pass `None`.
    pub(crate) async fn make_request(
        &self,
        method: Method,
        url: &str,
        api_version: Option<&str>,
    ) -> Result<RequestBuilder, ClientError> {
        let token = self.bearer_token().await?;
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(%method, url, request_id, "Sending management request");

        let mut request = self
            .http_client
            .request(method, url)
            .bearer_auth(token)
            .header("x-ms-client-request-id", request_id);
        if let Some(version) = api_version {
            request = request.query(&[("api-version", version)]);
        }
        Ok(request)
    }

    /// Map a non-success response to a structured error
    pub(crate) fn handle_error_response(
        &self,
        method: &Method,
        url: &str,
        status: StatusCode,
        error_text: &str,
    ) -> ClientError {
        match serde_json::from_str::<ArmErrorResponse>(error_text) {
            Ok(error_response) => ClientError::api(
                method.as_str(),
                url,
                status,
                error_response.error.code,
                error_response.error.message,
            ),
            Err(_) => {
                let message = if error_text.trim().is_empty() {
                    status.canonical_reason().unwrap_or_default().to_string()
                } else {
                    error_text.to_string()
                };
                ClientError::api(method.as_str(), url, status, "Unknown", message)
            }
        }
    }
}
