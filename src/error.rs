//! # Errors
//!
//! Typed failures surfaced by the management client, the scenarios and the
//! configuration loader.
//!
//! Orchestration code wraps these in `anyhow::Error`; the scenario assertions
//! downcast back to [`ClientError`] to inspect the provider status code.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Failure returned by a [`VaultManagement`](crate::provider::VaultManagement) call
#[derive(Debug, Error)]
pub enum ClientError {
    /// Structured error returned by the management API
    #[error("{method} {url} returned HTTP {status}: {code}: {message}")]
    Api {
        method: String,
        url: String,
        status: StatusCode,
        code: String,
        message: String,
    },

    /// A long-running operation reached a terminal failure state
    #[error("long-running operation {url} finished with status {status}: {message}")]
    OperationFailed {
        url: String,
        status: String,
        message: String,
    },

    /// A long-running operation did not reach a terminal state in time
    #[error("long-running operation {url} did not complete within {elapsed:?}")]
    OperationTimedOut { url: String, elapsed: Duration },

    /// Token acquisition failed
    #[error("failed to acquire management API token: {0}")]
    Credential(String),

    /// The request never produced an HTTP response
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected shape
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Build a structured API error
    pub fn api(
        method: impl Into<String>,
        url: impl Into<String>,
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Api {
            method: method.into(),
            url: url.into(),
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// HTTP status of a structured API error, if this is one
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is a structured "not found" error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

/// Scenario post-condition that did not hold
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("vault name mismatch: expected '{expected}', provider returned '{actual}'")]
    NameMismatch { expected: String, actual: String },

    #[error("vault '{name}' was not ready after {elapsed:?} ({polls} polls)")]
    ReadinessTimedOut {
        name: String,
        elapsed: Duration,
        polls: u32,
    },

    #[error("no deleted-vault record for '{name}' after deleting it")]
    DeletedRecordMissing { name: String },

    #[error("vault '{name}' does not report soft delete as enabled")]
    SoftDeleteNotEnabled { name: String },

    #[error("{resource} is still present after purge")]
    StillPresent { resource: String },
}

/// Configuration loading failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
