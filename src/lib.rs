//! # Key Vault Recovery
//!
//! Drives an Azure Key Vault through the management-plane lifecycle
//! create → soft-delete → recover → delete → purge and checks the provider's
//! post-conditions after every step.
//!
//! ## Modules
//!
//! - `config`: environment-driven [`SampleConfig`](config::SampleConfig)
//! - `provider`: the [`VaultManagement`](provider::VaultManagement) trait, the
//!   Azure Resource Manager client and an in-memory simulation
//! - `scenario`: the scenario runner, readiness wait and assertions
//! - `observability`: tracing setup and Prometheus metrics

pub mod backoff;
pub mod config;
pub mod constants;
pub mod error;
pub mod observability;
pub mod provider;
pub mod scenario;

pub use config::SampleConfig;
pub use error::{ClientError, ConfigError, ScenarioError};
pub use provider::VaultManagement;
pub use scenario::{ScenarioKind, ScenarioReport, ScenarioRunner};
