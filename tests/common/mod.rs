//! Common test utilities for the integration tests
//!
//! Provides rustls crypto provider setup and configuration/client builders
//! pointed at a local mock server.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use keyvault_recovery::config::{AuthConfig, PollConfig, SampleConfig};
use keyvault_recovery::provider::azure::ArmClient;
use std::sync::Once;
use std::time::Duration;

pub const SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000001";
pub const TENANT_ID: &str = "00000000-0000-0000-0000-000000000002";
pub const RESOURCE_GROUP: &str = "recovery-rg";
pub const VAULT_NAME: &str = "recovery-vault";
pub const LOCATION: &str = "eastus";

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // The pact mock server may already have installed the ring provider
        if rustls::crypto::CryptoProvider::get_default().is_none() {
            rustls::crypto::ring::default_provider()
                .install_default()
                .expect("Failed to install rustls crypto provider");
        }
    });
}

/// Configuration routed to `endpoint` with the mock credential and fast polling
pub fn test_config(endpoint: &str) -> SampleConfig {
    let mut config = SampleConfig::new(SUBSCRIPTION_ID, TENANT_ID, RESOURCE_GROUP, VAULT_NAME);
    config.management_endpoint = endpoint.trim_end_matches('/').to_string();
    config.location = LOCATION.to_string();
    config.auth = AuthConfig::Mock;
    config.operation = PollConfig::new(
        Duration::from_millis(10),
        Duration::from_millis(50),
        Duration::from_secs(5),
    );
    config.readiness.poll = PollConfig::new(
        Duration::from_millis(1),
        Duration::from_millis(5),
        Duration::from_secs(1),
    );
    config
}

/// Management client for a mock server
pub fn arm_client(endpoint: &str) -> ArmClient {
    init_rustls();
    ArmClient::new(&test_config(endpoint)).expect("Failed to create management client")
}

/// ARM path of the test vault
pub fn vault_path() -> String {
    format!(
        "/subscriptions/{SUBSCRIPTION_ID}/resourceGroups/{RESOURCE_GROUP}/providers/Microsoft.KeyVault/vaults/{VAULT_NAME}"
    )
}

/// ARM path of the test vault's deleted record
pub fn deleted_vault_path() -> String {
    format!(
        "/subscriptions/{SUBSCRIPTION_ID}/providers/Microsoft.KeyVault/locations/{LOCATION}/deletedVaults/{VAULT_NAME}"
    )
}

/// Vault JSON as returned by the management API
pub fn vault_json(soft_delete: bool) -> serde_json::Value {
    serde_json::json!({
        "id": vault_path(),
        "name": VAULT_NAME,
        "type": "Microsoft.KeyVault/vaults",
        "location": LOCATION,
        "tags": {},
        "properties": {
            "tenantId": TENANT_ID,
            "sku": { "family": "A", "name": "standard" },
            "accessPolicies": [],
            "enableSoftDelete": soft_delete,
            "softDeleteRetentionInDays": 90,
            "vaultUri": format!("https://{VAULT_NAME}.vault.azure.net/"),
            "provisioningState": "Succeeded"
        }
    })
}

/// Deleted-vault JSON as returned by the management API
pub fn deleted_vault_json() -> serde_json::Value {
    serde_json::json!({
        "id": deleted_vault_path(),
        "name": VAULT_NAME,
        "type": "Microsoft.KeyVault/deletedVaults",
        "properties": {
            "vaultId": vault_path(),
            "location": LOCATION,
            "deletionDate": "2024-01-01T00:00:00Z",
            "scheduledPurgeDate": "2024-03-31T00:00:00Z",
            "purgeProtectionEnabled": false,
            "tags": {}
        }
    })
}
