//! # Assertions
//!
//! Turns an expected provider failure into a passing check.

use crate::error::{ClientError, ScenarioError};
use reqwest::StatusCode;
use tracing::{error, info};

/// Succeed if `error` is a structured provider error with `expected` status
///
/// # Errors
/// Returns `error` unchanged when it is any other failure
pub fn verify_expected_status(error: anyhow::Error, expected: StatusCode) -> anyhow::Result<()> {
    match error.downcast_ref::<ClientError>() {
        Some(ClientError::Api {
            status,
            code,
            message,
            ..
        }) if *status == expected => {
            info!(
                status = status.as_u16(),
                code = code.as_str(),
                message = message.as_str(),
                "Received expected status"
            );
            Ok(())
        }
        _ => {
            error!(expected = expected.as_u16(), "Unexpected failure: {error:#}");
            Err(error)
        }
    }
}

/// Check that fetching `resource` reports "not found"
///
/// # Errors
/// - `ScenarioError::StillPresent` if the fetch succeeded
/// - the fetch error itself if it is not a "not found"
pub fn assert_absent<T>(result: Result<T, ClientError>, resource: &str) -> anyhow::Result<()> {
    match result {
        Ok(_) => {
            error!(resource, "Resource still exists after purge");
            Err(ScenarioError::StillPresent {
                resource: resource.to_string(),
            }
            .into())
        }
        Err(e) => verify_expected_status(
            anyhow::Error::new(e).context(format!("Fetching {resource}")),
            StatusCode::NOT_FOUND,
        ),
    }
}
