//! # Resource Identifiers
//!
//! Typed Azure Resource Manager identifiers for the resources the scenarios touch.

use crate::constants::{KEY_VAULT_API_VERSION, RESOURCE_GROUP_API_VERSION};
use std::fmt;

/// ARM resource identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceId {
    ResourceGroup {
        subscription_id: String,
        name: String,
    },
    Vault {
        subscription_id: String,
        resource_group: String,
        name: String,
    },
    /// Soft-deleted vault record; addressed by region, not resource group
    DeletedVault {
        subscription_id: String,
        location: String,
        name: String,
    },
}

impl ResourceId {
    pub fn resource_group(subscription_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ResourceGroup {
            subscription_id: subscription_id.into(),
            name: name.into(),
        }
    }

    pub fn vault(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::Vault {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }

    pub fn deleted_vault(
        subscription_id: impl Into<String>,
        location: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::DeletedVault {
            subscription_id: subscription_id.into(),
            location: location.into(),
            name: name.into(),
        }
    }

    /// Resource name (last path segment)
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::ResourceGroup { name, .. }
            | Self::Vault { name, .. }
            | Self::DeletedVault { name, .. } => name,
        }
    }

    #[must_use]
    pub fn subscription_id(&self) -> &str {
        match self {
            Self::ResourceGroup {
                subscription_id, ..
            }
            | Self::Vault {
                subscription_id, ..
            }
            | Self::DeletedVault {
                subscription_id, ..
            } => subscription_id,
        }
    }

    /// API version the management endpoint expects for this resource type
    #[must_use]
    pub fn api_version(&self) -> &'static str {
        match self {
            Self::ResourceGroup { .. } => RESOURCE_GROUP_API_VERSION,
            Self::Vault { .. } | Self::DeletedVault { .. } => KEY_VAULT_API_VERSION,
        }
    }

    /// Path relative to the management endpoint, starting with `/`
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::ResourceGroup {
                subscription_id,
                name,
            } => format!("/subscriptions/{subscription_id}/resourceGroups/{name}"),
            Self::Vault {
                subscription_id,
                resource_group,
                name,
            } => format!(
                "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.KeyVault/vaults/{name}"
            ),
            Self::DeletedVault {
                subscription_id,
                location,
                name,
            } => format!(
                "/subscriptions/{subscription_id}/providers/Microsoft.KeyVault/locations/{location}/deletedVaults/{name}"
            ),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
