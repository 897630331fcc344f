//! # Readiness Wait
//!
//! Polls a newly created vault until the provider reports it usable, instead
//! of sleeping for a fixed interval.
//!
//! A vault is ready once it can be fetched with `provisioningState = Succeeded`
//! and, when DNS checking is enabled, its `vaultUri` host resolves.

use crate::backoff::FibonacciBackoff;
use crate::config::ReadinessConfig;
use crate::error::ScenarioError;
use crate::observability::metrics;
use crate::provider::{Lookup, ResourceId, Vault, VaultManagement};
use anyhow::Context;
use tokio::time::Instant;
use tracing::{debug, info};

/// Poll `id` with Fibonacci backoff until ready or the timeout elapses
///
/// # Errors
/// - `ScenarioError::ReadinessTimedOut` when the vault is not ready in time
/// - any fetch failure other than "not found"
pub async fn wait_until_ready<C>(
    client: &C,
    id: &ResourceId,
    config: &ReadinessConfig,
) -> anyhow::Result<Vault>
where
    C: VaultManagement + ?Sized,
{
    let started = Instant::now();
    let mut backoff = FibonacciBackoff::new(config.poll.min_interval, config.poll.max_interval);
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        metrics::increment_readiness_polls();

        let lookup = Lookup::from_result(client.get_vault(id).await)
            .with_context(|| format!("Failed to poll readiness of {id}"))?;
        match lookup {
            Lookup::Found(vault) if vault.is_provisioned() => {
                if !config.check_dns || dns_resolves(&vault).await {
                    info!(polls, elapsed = ?started.elapsed(), "Vault is ready");
                    return Ok(vault);
                }
                debug!(polls, "Vault provisioned, waiting for DNS");
            }
            Lookup::Found(vault) => {
                debug!(polls, state = ?vault.properties.provisioning_state, "Vault still provisioning");
            }
            Lookup::NotFound { code, .. } => {
                debug!(polls, code = code.as_str(), "Vault not visible yet");
            }
        }

        let elapsed = started.elapsed();
        if elapsed >= config.poll.timeout {
            return Err(ScenarioError::ReadinessTimedOut {
                name: id.name().to_string(),
                elapsed,
                polls,
            }
            .into());
        }
        let delay = backoff.next_backoff().min(config.poll.timeout - elapsed);
        tokio::time::sleep(delay).await;
    }
}

/// Whether the host of the vault URI resolves; a vault without a URI passes
async fn dns_resolves(vault: &Vault) -> bool {
    let Some(host) = vault
        .properties
        .vault_uri
        .as_deref()
        .and_then(|uri| reqwest::Url::parse(uri).ok())
        .and_then(|url| url.host_str().map(str::to_string))
    else {
        return true;
    };

    let resolves = match tokio::net::lookup_host((host.as_str(), 443)).await {
        Ok(mut addrs) => addrs.next().is_some(),
        Err(e) => {
            debug!(host = host.as_str(), error = %e, "Vault host does not resolve yet");
            false
        }
    };
    resolves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollConfig;
    use crate::provider::memory::InMemoryVaultManagement;
    use crate::error::ClientError;
    use crate::provider::{
        DeletedVault, ProvisioningState, ResourceGroup, Sku, VaultCreateOrUpdateParameters,
        VaultPatchParameters, VaultProperties,
    };
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::time::Duration;

    /// Provider whose only vault is fixed up front
    struct FixedVault(Vault);

    impl FixedVault {
        fn with_uri(uri: Option<&str>) -> Self {
            let mut properties = VaultProperties::new("tenant", Sku::standard());
            properties.vault_uri = uri.map(str::to_string);
            properties.provisioning_state = Some(ProvisioningState::Succeeded);
            Self(Vault {
                id: ResourceId::vault("sub", "rg", "v1").path(),
                name: "v1".to_string(),
                resource_type: None,
                location: "eastus".to_string(),
                properties,
            })
        }
    }

    fn unsupported() -> ClientError {
        ClientError::api("GET", "/", StatusCode::NOT_IMPLEMENTED, "NotSupported", "")
    }

    #[async_trait]
    impl VaultManagement for FixedVault {
        fn subscription_id(&self) -> &str {
            "sub"
        }

        async fn create_or_update_resource_group(
            &self,
            _name: &str,
            _location: &str,
        ) -> Result<ResourceGroup, ClientError> {
            Err(unsupported())
        }

        async fn create_or_update_vault(
            &self,
            _resource_group: &str,
            _name: &str,
            _parameters: &VaultCreateOrUpdateParameters,
        ) -> Result<Vault, ClientError> {
            Err(unsupported())
        }

        async fn update_vault(
            &self,
            _resource_group: &str,
            _name: &str,
            _patch: &VaultPatchParameters,
        ) -> Result<Vault, ClientError> {
            Err(unsupported())
        }

        async fn get_vault(&self, _id: &ResourceId) -> Result<Vault, ClientError> {
            Ok(self.0.clone())
        }

        async fn delete_vault(&self, _id: &ResourceId) -> Result<(), ClientError> {
            Err(unsupported())
        }

        async fn get_deleted_vault(&self, _id: &ResourceId) -> Result<DeletedVault, ClientError> {
            Err(unsupported())
        }

        async fn purge_deleted_vault(&self, _id: &ResourceId) -> Result<(), ClientError> {
            Err(unsupported())
        }
    }

    fn with_dns(mut config: ReadinessConfig) -> ReadinessConfig {
        config.check_dns = true;
        config
    }

    fn readiness(timeout_secs: u64) -> ReadinessConfig {
        ReadinessConfig {
            poll: PollConfig::new(
                Duration::from_secs(1),
                Duration::from_secs(8),
                Duration::from_secs(timeout_secs),
            ),
            check_dns: false,
        }
    }

    async fn provider_with_vault(delay: u32) -> InMemoryVaultManagement {
        let provider = InMemoryVaultManagement::new("sub").with_propagation_delay(delay);
        provider
            .create_or_update_resource_group("rg", "eastus")
            .await
            .unwrap();
        provider
            .create_or_update_vault(
                "rg",
                "v1",
                &VaultCreateOrUpdateParameters::new(
                    "eastus",
                    VaultProperties::new("tenant", Sku::standard()).with_soft_delete(true),
                ),
            )
            .await
            .unwrap();
        provider
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_propagation_delay() {
        let provider = provider_with_vault(3).await;
        let started = Instant::now();

        let vault = wait_until_ready(&provider, &ResourceId::vault("sub", "rg", "v1"), &readiness(60))
            .await
            .unwrap();

        assert_eq!(vault.name, "v1");
        // Three misses: waits of 1s, 1s and 2s
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_never_visible() {
        let provider = provider_with_vault(0).await;
        let id = ResourceId::vault("sub", "rg", "missing");

        let err = wait_until_ready(&provider, &id, &readiness(10)).await.unwrap_err();
        match err.downcast_ref::<ScenarioError>() {
            Some(ScenarioError::ReadinessTimedOut { name, elapsed, polls }) => {
                assert_eq!(name, "missing");
                assert_eq!(*elapsed, Duration::from_secs(10));
                // Polls at 0, 1, 2, 4, 7 and 10 seconds
                assert_eq!(*polls, 6);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_failures_abort_immediately() {
        let provider = provider_with_vault(0).await;
        provider.fail_next("get_vault", StatusCode::FORBIDDEN, "AuthorizationFailed", "denied");

        let err = wait_until_ready(&provider, &ResourceId::vault("sub", "rg", "v1"), &readiness(60))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to poll readiness"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_vault_without_uri_is_ready_with_dns_check() {
        let provider = FixedVault::with_uri(None);
        let started = Instant::now();

        let vault = wait_until_ready(
            &provider,
            &ResourceId::vault("sub", "rg", "v1"),
            &with_dns(readiness(10)),
        )
        .await
        .unwrap();

        assert_eq!(vault.name, "v1");
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ip_literal_uri_resolves() {
        let provider = FixedVault::with_uri(Some("https://127.0.0.1/"));

        let vault = wait_until_ready(
            &provider,
            &ResourceId::vault("sub", "rg", "v1"),
            &with_dns(readiness(10)),
        )
        .await
        .unwrap();
        assert_eq!(vault.properties.vault_uri.as_deref(), Some("https://127.0.0.1/"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresolvable_host_times_out() {
        let provider = FixedVault::with_uri(Some("https://x.invalid/"));

        let err = wait_until_ready(
            &provider,
            &ResourceId::vault("sub", "rg", "v1"),
            &with_dns(readiness(3)),
        )
        .await
        .unwrap_err();
        match err.downcast_ref::<ScenarioError>() {
            Some(ScenarioError::ReadinessTimedOut { name, polls, .. }) => {
                assert_eq!(name, "v1");
                // Polls at 0, 1, 2 and 3 seconds
                assert_eq!(*polls, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dns_check_disabled_ignores_unresolvable_host() {
        let provider = FixedVault::with_uri(Some("https://x.invalid/"));

        let vault = wait_until_ready(&provider, &ResourceId::vault("sub", "rg", "v1"), &readiness(3))
            .await
            .unwrap();
        assert_eq!(vault.name, "v1");
    }
}
