//! # Resource Models
//!
//! Serde models of the Azure Resource Manager JSON shapes for resource groups,
//! vaults and deleted-vault records.
//!
//! References:
//! - [Vaults - Create Or Update](https://learn.microsoft.com/en-us/rest/api/keyvault/keyvault/vaults/create-or-update)
//! - [Vaults - Get Deleted](https://learn.microsoft.com/en-us/rest/api/keyvault/keyvault/vaults/get-deleted)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resource group as returned by the management API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub location: String,
}

/// Body of a resource group create-or-update call
#[derive(Debug, Clone, Serialize)]
pub struct ResourceGroupParameters {
    pub location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkuFamily {
    A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkuName {
    Standard,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    pub family: SkuFamily,
    pub name: SkuName,
}

impl Sku {
    #[must_use]
    pub fn standard() -> Self {
        Self {
            family: SkuFamily::A,
            name: SkuName::Standard,
        }
    }
}

/// Whether a create-or-update call creates a vault or restores a soft-deleted one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreateMode {
    Default,
    Recover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningState {
    Succeeded,
    RegisteringDns,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub secrets: Vec<String>,
    #[serde(default)]
    pub certificates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicyEntry {
    pub tenant_id: String,
    pub object_id: String,
    pub permissions: Permissions,
}

impl AccessPolicyEntry {
    /// Policy letting the sample's own principal manage keys and secrets
    pub fn for_operator(tenant_id: impl Into<String>, object_id: impl Into<String>) -> Self {
        let all = |ops: &[&str]| ops.iter().map(|op| (*op).to_string()).collect();
        Self {
            tenant_id: tenant_id.into(),
            object_id: object_id.into(),
            permissions: Permissions {
                keys: all(&["get", "list", "create", "delete", "recover", "purge"]),
                secrets: all(&["get", "list", "set", "delete", "recover", "purge"]),
                certificates: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultProperties {
    pub tenant_id: String,
    pub sku: Sku,
    #[serde(default)]
    pub access_policies: Vec<AccessPolicyEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_soft_delete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_delete_retention_in_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_mode: Option<CreateMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
}

impl VaultProperties {
    pub fn new(tenant_id: impl Into<String>, sku: Sku) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            sku,
            access_policies: Vec::new(),
            enable_soft_delete: None,
            soft_delete_retention_in_days: None,
            create_mode: None,
            vault_uri: None,
            provisioning_state: None,
        }
    }

    #[must_use]
    pub fn with_soft_delete(mut self, enabled: bool) -> Self {
        self.enable_soft_delete = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_create_mode(mut self, mode: CreateMode) -> Self {
        self.create_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_access_policy(mut self, policy: AccessPolicyEntry) -> Self {
        self.access_policies.push(policy);
        self
    }
}

/// Body of a vault create-or-update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultCreateOrUpdateParameters {
    pub location: String,
    pub properties: VaultProperties,
}

impl VaultCreateOrUpdateParameters {
    pub fn new(location: impl Into<String>, properties: VaultProperties) -> Self {
        Self {
            location: location.into(),
            properties,
        }
    }

    #[must_use]
    pub fn create_mode(&self) -> CreateMode {
        self.properties.create_mode.unwrap_or(CreateMode::Default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultPatchProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_soft_delete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_delete_retention_in_days: Option<i64>,
}

/// Body of a vault PATCH call; only the populated fields change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultPatchParameters {
    pub properties: VaultPatchProperties,
}

impl VaultPatchParameters {
    #[must_use]
    pub fn enable_soft_delete() -> Self {
        Self {
            properties: VaultPatchProperties {
                enable_soft_delete: Some(true),
                ..VaultPatchProperties::default()
            },
        }
    }
}

/// Live vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub location: String,
    pub properties: VaultProperties,
}

impl Vault {
    #[must_use]
    pub fn soft_delete_enabled(&self) -> bool {
        self.properties.enable_soft_delete.unwrap_or(false)
    }

    /// A vault without a reported provisioning state is treated as provisioned
    #[must_use]
    pub fn is_provisioned(&self) -> bool {
        matches!(
            self.properties.provisioning_state,
            None | Some(ProvisioningState::Succeeded)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedVaultProperties {
    #[serde(default)]
    pub vault_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub deletion_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_purge_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub purge_protection_enabled: Option<bool>,
}

/// Provider tombstone for a soft-deleted vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedVault {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub properties: DeletedVaultProperties,
}

impl DeletedVault {
    #[must_use]
    pub fn deleted_on(&self) -> Option<DateTime<Utc>> {
        self.properties.deletion_date
    }

    #[must_use]
    pub fn scheduled_purge_on(&self) -> Option<DateTime<Utc>> {
        self.properties.scheduled_purge_date
    }
}
