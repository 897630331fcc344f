//! # Credentials
//!
//! Builds the `TokenCredential` used to authenticate management API calls.
//!
//! Supported sources, selected by [`AuthConfig`]:
//! - Managed Identity and Workload Identity via `azure_identity`
//! - Service principal client secret via `azure_identity`
//! - A pre-acquired bearer token
//! - A fixed dummy token for contract tests

use crate::config::{AuthConfig, SampleConfig};
use crate::error::ClientError;
use async_trait::async_trait;
use azure_core::credentials::{AccessToken, Secret, TokenCredential, TokenRequestOptions};
use azure_identity::{
    ClientSecretCredential, ClientSecretCredentialOptions, ManagedIdentityCredential,
    WorkloadIdentityCredential,
};
use std::sync::Arc;
use tracing::{debug, info};
use typespec_client_core::time::{Duration, OffsetDateTime};
use zeroize::Zeroizing;

/// Token handed out in contract-test mode
pub const MOCK_TOKEN: &str = "test-token";

/// Build the credential for the configured authentication method
///
/// # Errors
/// Returns `ClientError::Credential` if the identity credential cannot be constructed
pub fn build_credential(config: &SampleConfig) -> Result<Arc<dyn TokenCredential>, ClientError> {
    debug!(auth = config.auth.kind(), "Building management API credential");
    let credential: Arc<dyn TokenCredential> = match &config.auth {
        AuthConfig::Mock => {
            debug!("Pact mode: using mock Azure credential");
            Arc::new(StaticTokenCredential::new(MOCK_TOKEN))
        }
        AuthConfig::StaticToken(token) => {
            info!("Using pre-acquired access token from AZURE_ACCESS_TOKEN");
            Arc::new(StaticTokenCredential::new(token.as_str()))
        }
        AuthConfig::ServicePrincipal {
            client_id,
            client_secret,
        } => {
            info!(client_id = %client_id, "Using service principal authentication");
            ClientSecretCredential::new(
                &config.tenant_id,
                client_id.clone(),
                Secret::new(client_secret.as_str().to_owned()),
                Some(ClientSecretCredentialOptions::default()),
            )
            .map_err(|e| {
                ClientError::Credential(format!("Failed to create ClientSecretCredential: {e}"))
            })?
        }
        AuthConfig::WorkloadIdentity { client_id } => {
            info!(
                "Using Azure Workload Identity authentication with client ID: {}",
                client_id
            );
            let options = azure_identity::WorkloadIdentityCredentialOptions {
                client_id: Some(client_id.clone()),
                ..Default::default()
            };
            WorkloadIdentityCredential::new(Some(options)).map_err(|e| {
                ClientError::Credential(format!("Failed to create WorkloadIdentityCredential: {e}"))
            })?
        }
        AuthConfig::ManagedIdentity => {
            info!("No client credentials configured, using Managed Identity");
            ManagedIdentityCredential::new(None).map_err(|e| {
                ClientError::Credential(format!("Failed to create ManagedIdentityCredential: {e}"))
            })?
        }
    };

    Ok(credential)
}

/// Credential returning a fixed bearer token
pub struct StaticTokenCredential {
    token: Zeroizing<String>,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
        }
    }
}

impl std::fmt::Debug for StaticTokenCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenCredential").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(
        &self,
        _scopes: &[&str],
        _options: Option<TokenRequestOptions>,
    ) -> azure_core::Result<AccessToken> {
        Ok(AccessToken::new(
            Secret::new(self.token.to_string()),
            OffsetDateTime::now_utc() + Duration::seconds(3600),
        ))
    }
}
