//! # Provider Modules
//!
//! Management-plane access to Key Vault resources.
//!
//! - [`VaultManagement`]: the operations the scenarios drive
//! - `azure`: REST implementation against Azure Resource Manager
//! - `memory`: local simulation of the provider lifecycle

use crate::error::ClientError;
use async_trait::async_trait;

pub mod azure;
pub mod memory;
pub mod models;
pub mod resource_id;

pub use models::*;
pub use resource_id::ResourceId;

/// Management-plane operations on resource groups and vaults
///
/// Every call blocks until the provider reports the operation as terminal.
#[async_trait]
pub trait VaultManagement: Send + Sync {
    /// Subscription every resource id is scoped to
    fn subscription_id(&self) -> &str;

    /// Create the resource group if absent; no-op when it already exists
    async fn create_or_update_resource_group(
        &self,
        name: &str,
        location: &str,
    ) -> Result<ResourceGroup, ClientError>;

    async fn create_or_update_vault(
        &self,
        resource_group: &str,
        name: &str,
        parameters: &VaultCreateOrUpdateParameters,
    ) -> Result<Vault, ClientError>;

    /// Apply a partial update to a live vault
    async fn update_vault(
        &self,
        resource_group: &str,
        name: &str,
        patch: &VaultPatchParameters,
    ) -> Result<Vault, ClientError>;

    async fn get_vault(&self, id: &ResourceId) -> Result<Vault, ClientError>;

    async fn delete_vault(&self, id: &ResourceId) -> Result<(), ClientError>;

    async fn get_deleted_vault(&self, id: &ResourceId) -> Result<DeletedVault, ClientError>;

    /// Permanently remove a deleted-vault record
    async fn purge_deleted_vault(&self, id: &ResourceId) -> Result<(), ClientError>;

    /// Restore a soft-deleted vault under its original name and region
    async fn recover_vault(
        &self,
        resource_group: &str,
        name: &str,
        location: &str,
        tenant_id: &str,
    ) -> Result<Vault, ClientError> {
        let parameters = VaultCreateOrUpdateParameters::new(
            location,
            VaultProperties::new(tenant_id, Sku::standard()).with_create_mode(CreateMode::Recover),
        );
        self.create_or_update_vault(resource_group, name, &parameters)
            .await
    }
}

/// Outcome of a fetch where absence is a legitimate answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound { code: String, message: String },
}

impl<T> Lookup<T> {
    /// Split a client result into found / not found; other failures stay errors
    ///
    /// # Errors
    /// Returns the original error unless it is a structured "not found"
    pub fn from_result(result: Result<T, ClientError>) -> Result<Self, ClientError> {
        match result {
            Ok(value) => Ok(Self::Found(value)),
            Err(ClientError::Api {
                status,
                code,
                message,
                ..
            }) if status == reqwest::StatusCode::NOT_FOUND => Ok(Self::NotFound { code, message }),
            Err(e) => Err(e),
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound { .. } => None,
        }
    }
}
