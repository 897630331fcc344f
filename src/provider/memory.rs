//! # In-Memory Provider
//!
//! Local simulation of the Key Vault management plane, used by `--dry-run`
//! and the scenario tests.
//!
//! Modelled behaviour:
//! - deleting a soft-delete-enabled vault leaves a deleted-vault record
//!   (tombstone) for the retention period; otherwise the vault is gone
//! - a plain create colliding with a tombstone, or with a live vault of the
//!   same name in another resource group, fails with a conflict
//! - recover restores the tombstoned vault; purge removes the tombstone
//! - soft delete cannot be turned off once enabled
//! - optional propagation delay: the first N reads after a create report "not found"
//! - one-shot failure injection per operation

use crate::constants::DEFAULT_SOFT_DELETE_RETENTION_DAYS;
use crate::error::ClientError;
use crate::provider::{
    CreateMode, DeletedVault, DeletedVaultProperties, ProvisioningState, ResourceGroup,
    ResourceId, Vault, VaultCreateOrUpdateParameters, VaultManagement, VaultPatchParameters,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug)]
struct InjectedFailure {
    operation: &'static str,
    status: StatusCode,
    code: String,
    message: String,
}

#[derive(Debug, Clone)]
struct Tombstone {
    record: DeletedVault,
    resource_group: String,
    vault: Vault,
}

#[derive(Debug, Default)]
struct State {
    resource_groups: HashMap<String, ResourceGroup>,
    /// Live vaults by lowercase name with their resource group
    vaults: HashMap<String, (String, Vault)>,
    /// Tombstones by lowercase name
    deleted: HashMap<String, Tombstone>,
    /// Remaining reads that report "not found" per lowercase vault name
    unpropagated: HashMap<String, u32>,
    failures: Vec<InjectedFailure>,
    calls: Vec<&'static str>,
}

/// In-memory [`VaultManagement`] implementation
#[derive(Debug)]
pub struct InMemoryVaultManagement {
    subscription_id: String,
    propagation_delay: u32,
    state: Mutex<State>,
}

impl InMemoryVaultManagement {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            propagation_delay: 0,
            state: Mutex::new(State::default()),
        }
    }

    /// Report "not found" for the first `reads` reads of each newly created vault
    #[must_use]
    pub fn with_propagation_delay(mut self, reads: u32) -> Self {
        self.propagation_delay = reads;
        self
    }

    /// Make the next call of `operation` fail with the given status
    pub fn fail_next(
        &self,
        operation: &'static str,
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.lock().failures.push(InjectedFailure {
            operation,
            status,
            code: code.into(),
            message: message.into(),
        });
    }

    /// Names of the operations invoked so far, in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    /// Whether a live vault with this name exists
    pub fn has_vault(&self, name: &str) -> bool {
        self.lock().vaults.contains_key(&name.to_lowercase())
    }

    /// Whether a deleted-vault record with this name exists
    pub fn has_deleted_vault(&self, name: &str) -> bool {
        self.lock().deleted.contains_key(&name.to_lowercase())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Record the call and consume an injected failure for it, if any
fn enter(
    state: &mut State,
    operation: &'static str,
    method: &str,
    path: &str,
) -> Result<(), ClientError> {
    debug!(operation, path, "In-memory call");
    state.calls.push(operation);
    match state.failures.iter().position(|f| f.operation == operation) {
        Some(index) => {
            let failure = state.failures.remove(index);
            Err(ClientError::api(
                method,
                path,
                failure.status,
                failure.code,
                failure.message,
            ))
        }
        None => Ok(()),
    }
}

fn vault_parts<'a>(id: &'a ResourceId, method: &str) -> Result<(&'a str, &'a str), ClientError> {
    match id {
        ResourceId::Vault {
            resource_group,
            name,
            ..
        } => Ok((resource_group, name)),
        other => Err(invalid_id(method, other, "a vault id")),
    }
}

fn invalid_id(method: &str, id: &ResourceId, expected: &str) -> ClientError {
    ClientError::api(
        method,
        id.path(),
        StatusCode::BAD_REQUEST,
        "InvalidResourceId",
        format!("expected {expected}"),
    )
}

fn not_found(method: &str, path: &str, message: String) -> ClientError {
    ClientError::api(method, path, StatusCode::NOT_FOUND, "ResourceNotFound", message)
}

#[async_trait]
impl VaultManagement for InMemoryVaultManagement {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn create_or_update_resource_group(
        &self,
        name: &str,
        location: &str,
    ) -> Result<ResourceGroup, ClientError> {
        let id = ResourceId::resource_group(&self.subscription_id, name);
        let path = id.path();
        let mut state = self.lock();
        enter(&mut state, "create_or_update_resource_group", "PUT", &path)?;

        let group = state
            .resource_groups
            .entry(name.to_lowercase())
            .or_insert_with(|| ResourceGroup {
                id: path.clone(),
                name: name.to_string(),
                location: location.to_string(),
            })
            .clone();
        Ok(group)
    }

    async fn create_or_update_vault(
        &self,
        resource_group: &str,
        name: &str,
        parameters: &VaultCreateOrUpdateParameters,
    ) -> Result<Vault, ClientError> {
        let id = ResourceId::vault(&self.subscription_id, resource_group, name);
        let path = id.path();
        let key = name.to_lowercase();
        let mut state = self.lock();
        enter(&mut state, "create_or_update_vault", "PUT", &path)?;

        if !state
            .resource_groups
            .contains_key(&resource_group.to_lowercase())
        {
            return Err(ClientError::api(
                "PUT",
                &path,
                StatusCode::NOT_FOUND,
                "ResourceGroupNotFound",
                format!("Resource group '{resource_group}' could not be found."),
            ));
        }

        if parameters.create_mode() == CreateMode::Recover {
            let tombstone = match state.deleted.get(&key) {
                Some(t) if t.vault.location.eq_ignore_ascii_case(&parameters.location) => {
                    t.clone()
                }
                _ => {
                    return Err(not_found(
                        "PUT",
                        &path,
                        format!("No deleted vault named '{name}' in '{}'", parameters.location),
                    ))
                }
            };
            state.deleted.remove(&key);

            let mut vault = tombstone.vault;
            vault.id = path.clone();
            vault.properties.provisioning_state = Some(ProvisioningState::Succeeded);
            state
                .vaults
                .insert(key, (resource_group.to_string(), vault.clone()));
            return Ok(vault);
        }

        if state.deleted.contains_key(&key) {
            return Err(ClientError::api(
                "PUT",
                &path,
                StatusCode::CONFLICT,
                "ConflictError",
                format!(
                    "A vault with the same name already exists in deleted state. \
                    You need to either recover or purge existing key vault. Vault name: {name}"
                ),
            ));
        }

        // Vault names are global across resource groups
        if let Some((group, _)) = state.vaults.get(&key) {
            if !group.eq_ignore_ascii_case(resource_group) {
                return Err(ClientError::api(
                    "PUT",
                    &path,
                    StatusCode::CONFLICT,
                    "VaultAlreadyExists",
                    format!("The vault name '{name}' is already in use."),
                ));
            }
        }

        let requested_soft_delete = parameters.properties.enable_soft_delete;
        if let Some((_, existing)) = state.vaults.get_mut(&key) {
            if existing.soft_delete_enabled() && requested_soft_delete == Some(false) {
                return Err(ClientError::api(
                    "PUT",
                    &path,
                    StatusCode::BAD_REQUEST,
                    "BadRequest",
                    "Soft delete cannot be disabled once it has been enabled",
                ));
            }
            existing.properties.sku = parameters.properties.sku;
            existing.properties.access_policies = parameters.properties.access_policies.clone();
            if requested_soft_delete == Some(true) && !existing.soft_delete_enabled() {
                existing.properties.enable_soft_delete = Some(true);
                existing.properties.soft_delete_retention_in_days =
                    Some(DEFAULT_SOFT_DELETE_RETENTION_DAYS);
            }
            return Ok(existing.clone());
        }

        let mut properties = parameters.properties.clone();
        properties.create_mode = None;
        properties.enable_soft_delete = Some(requested_soft_delete.unwrap_or(false));
        if properties.enable_soft_delete == Some(true) {
            properties.soft_delete_retention_in_days = Some(
                properties
                    .soft_delete_retention_in_days
                    .unwrap_or(DEFAULT_SOFT_DELETE_RETENTION_DAYS),
            );
        }
        properties.vault_uri = Some(format!("https://{key}.vault.azure.net/"));
        properties.provisioning_state = Some(ProvisioningState::Succeeded);

        let vault = Vault {
            id: path,
            name: name.to_string(),
            resource_type: Some("Microsoft.KeyVault/vaults".to_string()),
            location: parameters.location.clone(),
            properties,
        };
        if self.propagation_delay > 0 {
            state
                .unpropagated
                .insert(key.clone(), self.propagation_delay);
        }
        state
            .vaults
            .insert(key, (resource_group.to_string(), vault.clone()));
        Ok(vault)
    }

    async fn update_vault(
        &self,
        resource_group: &str,
        name: &str,
        patch: &VaultPatchParameters,
    ) -> Result<Vault, ClientError> {
        let id = ResourceId::vault(&self.subscription_id, resource_group, name);
        let path = id.path();
        let mut state = self.lock();
        enter(&mut state, "update_vault", "PATCH", &path)?;

        let vault = match state.vaults.get_mut(&name.to_lowercase()) {
            Some((group, vault)) if group.eq_ignore_ascii_case(resource_group) => vault,
            _ => {
                return Err(not_found(
                    "PATCH",
                    &path,
                    format!("The Resource 'Microsoft.KeyVault/vaults/{name}' was not found."),
                ))
            }
        };

        match patch.properties.enable_soft_delete {
            Some(false) if vault.soft_delete_enabled() => {
                return Err(ClientError::api(
                    "PATCH",
                    &path,
                    StatusCode::BAD_REQUEST,
                    "BadRequest",
                    "Soft delete cannot be disabled once it has been enabled",
                ))
            }
            Some(enabled) => vault.properties.enable_soft_delete = Some(enabled),
            None => {}
        }
        if vault.soft_delete_enabled() {
            vault.properties.soft_delete_retention_in_days = Some(
                patch
                    .properties
                    .soft_delete_retention_in_days
                    .or(vault.properties.soft_delete_retention_in_days)
                    .unwrap_or(DEFAULT_SOFT_DELETE_RETENTION_DAYS),
            );
        }
        Ok(vault.clone())
    }

    async fn get_vault(&self, id: &ResourceId) -> Result<Vault, ClientError> {
        let path = id.path();
        let mut state = self.lock();
        enter(&mut state, "get_vault", "GET", &path)?;
        let (resource_group, name) = vault_parts(id, "GET")?;
        let key = name.to_lowercase();

        if let Some(remaining) = state.unpropagated.get_mut(&key) {
            *remaining -= 1;
            if *remaining == 0 {
                state.unpropagated.remove(&key);
            }
            return Err(not_found(
                "GET",
                &path,
                format!("The Resource 'Microsoft.KeyVault/vaults/{name}' was not found."),
            ));
        }

        match state.vaults.get(&key) {
            Some((group, vault)) if group.eq_ignore_ascii_case(resource_group) => Ok(vault.clone()),
            _ => Err(not_found(
                "GET",
                &path,
                format!("The Resource 'Microsoft.KeyVault/vaults/{name}' was not found."),
            )),
        }
    }

    async fn delete_vault(&self, id: &ResourceId) -> Result<(), ClientError> {
        let path = id.path();
        let mut state = self.lock();
        enter(&mut state, "delete_vault", "DELETE", &path)?;
        let (resource_group, name) = vault_parts(id, "DELETE")?;
        let key = name.to_lowercase();

        let owned = matches!(
            state.vaults.get(&key),
            Some((group, _)) if group.eq_ignore_ascii_case(resource_group)
        );
        // Deleting an absent vault succeeds without effect
        if !owned {
            return Ok(());
        }
        let Some((_, vault)) = state.vaults.remove(&key) else {
            return Ok(());
        };
        state.unpropagated.remove(&key);

        if vault.soft_delete_enabled() {
            let deleted_on = Utc::now();
            let retention = vault
                .properties
                .soft_delete_retention_in_days
                .unwrap_or(DEFAULT_SOFT_DELETE_RETENTION_DAYS);
            let record_id = ResourceId::deleted_vault(&self.subscription_id, &vault.location, name);
            let record = DeletedVault {
                id: record_id.path(),
                name: vault.name.clone(),
                resource_type: Some("Microsoft.KeyVault/deletedVaults".to_string()),
                properties: DeletedVaultProperties {
                    vault_id: Some(vault.id.clone()),
                    location: Some(vault.location.clone()),
                    deletion_date: Some(deleted_on),
                    scheduled_purge_date: Some(deleted_on + chrono::Duration::days(retention)),
                    purge_protection_enabled: Some(false),
                },
            };
            state.deleted.insert(
                key,
                Tombstone {
                    record,
                    resource_group: resource_group.to_string(),
                    vault,
                },
            );
        }
        Ok(())
    }

    async fn get_deleted_vault(&self, id: &ResourceId) -> Result<DeletedVault, ClientError> {
        let path = id.path();
        let mut state = self.lock();
        enter(&mut state, "get_deleted_vault", "GET", &path)?;
        let ResourceId::DeletedVault { location, name, .. } = id else {
            return Err(invalid_id("GET", id, "a deleted vault id"));
        };

        match state.deleted.get(&name.to_lowercase()) {
            Some(t) if t.vault.location.eq_ignore_ascii_case(location) => Ok(t.record.clone()),
            _ => Err(not_found(
                "GET",
                &path,
                format!("Deleted vault '{name}' was not found in '{location}'."),
            )),
        }
    }

    async fn purge_deleted_vault(&self, id: &ResourceId) -> Result<(), ClientError> {
        let path = format!("{}/purge", id.path());
        let mut state = self.lock();
        enter(&mut state, "purge_deleted_vault", "POST", &path)?;
        let ResourceId::DeletedVault { location, name, .. } = id else {
            return Err(invalid_id("POST", id, "a deleted vault id"));
        };

        let key = name.to_lowercase();
        let matches_location = state
            .deleted
            .get(&key)
            .is_some_and(|t| t.vault.location.eq_ignore_ascii_case(location));
        if !matches_location {
            return Err(not_found(
                "POST",
                &path,
                format!("Deleted vault '{name}' was not found in '{location}'."),
            ));
        }
        if let Some(tombstone) = state.deleted.remove(&key) {
            debug!(
                vault = name.as_str(),
                resource_group = tombstone.resource_group.as_str(),
                "Purged deleted vault"
            );
        }
        Ok(())
    }
}
