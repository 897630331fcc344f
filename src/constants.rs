//! # Constants
//!
//! Shared constants used throughout the sample.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable.

/// Default Azure Resource Manager endpoint
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// Region the sample vaults are created in unless `AZURE_LOCATION` is set
pub const DEFAULT_LOCATION: &str = "eastus";

/// ARM API version for resource group operations
pub const RESOURCE_GROUP_API_VERSION: &str = "2021-04-01";

/// ARM API version for `Microsoft.KeyVault` operations
pub const KEY_VAULT_API_VERSION: &str = "2023-07-01";

/// Soft-delete retention the provider applies when none is requested (days)
pub const DEFAULT_SOFT_DELETE_RETENTION_DAYS: i64 = 90;

/// Default readiness poll starting interval (milliseconds)
pub const DEFAULT_READINESS_MIN_INTERVAL_MS: u64 = 1000;

/// Default readiness poll maximum interval (milliseconds)
pub const DEFAULT_READINESS_MAX_INTERVAL_MS: u64 = 8000;

/// Default readiness timeout (seconds)
pub const DEFAULT_READINESS_TIMEOUT_SECS: u64 = 60;

/// Default long-running operation poll starting interval (milliseconds)
pub const DEFAULT_OPERATION_MIN_INTERVAL_MS: u64 = 1000;

/// Default long-running operation poll maximum interval (milliseconds)
pub const DEFAULT_OPERATION_MAX_INTERVAL_MS: u64 = 30_000;

/// Default long-running operation timeout (seconds)
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 600;

/// Default HTTP request timeout for a single ARM call (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
