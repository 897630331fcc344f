//! # Scenarios
//!
//! Lifecycle scenarios driven through [`VaultManagement`](crate::provider::VaultManagement):
//!
//! - `new-vault`: vault created with soft delete enabled
//! - `existing-vault`: vault created without soft delete, which is then
//!   enabled before the delete/recover/purge sequence

pub mod assertions;
pub mod readiness;
pub mod runner;

pub use runner::ScenarioRunner;

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioKind {
    NewVault,
    ExistingVault,
}

impl ScenarioKind {
    pub const ALL: [Self; 2] = [Self::NewVault, Self::ExistingVault];

    /// Label used in logs and metrics
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewVault => "new_vault",
            Self::ExistingVault => "existing_vault",
        }
    }

    /// Whether the vault is created with soft delete already enabled
    #[must_use]
    pub fn soft_delete_at_creation(&self) -> bool {
        matches!(self, Self::NewVault)
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed scenario step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub number: usize,
    pub description: &'static str,
    pub duration: Duration,
}

/// Outcome of a successful scenario run
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub kind: ScenarioKind,
    pub vault_id: String,
    pub steps: Vec<StepRecord>,
    /// Deletion time reported by the first deleted-vault record
    pub deleted_on: Option<DateTime<Utc>>,
    pub scheduled_purge_on: Option<DateTime<Utc>>,
    pub soft_delete_retrofitted: bool,
    pub elapsed: Duration,
}

impl ScenarioReport {
    #[must_use]
    pub fn step_descriptions(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.description).collect()
    }
}
