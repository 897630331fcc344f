//! # Long-Running Operations
//!
//! Waits for asynchronous Azure Resource Manager operations to reach a
//! terminal state.
//!
//! Mutations that cannot complete synchronously answer `201`/`202` with one of:
//! - `Azure-AsyncOperation`: a status monitor whose body carries `status`
//! - `Location`: a URL answering `202` while running and another 2xx when done
//!
//! References:
//! - [Track asynchronous Azure operations](https://learn.microsoft.com/en-us/azure/azure-resource-manager/management/async-operations)

use super::ArmClient;
use crate::backoff::FibonacciBackoff;
use crate::error::ClientError;
use crate::observability::metrics;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const AZURE_ASYNC_OPERATION: &str = "Azure-AsyncOperation";

/// Where to poll for the outcome of an accepted operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollTarget {
    AsyncOperation(String),
    Location(String),
}

impl PollTarget {
    /// Pick the poll target from response headers; `Azure-AsyncOperation` wins over `Location`
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        header(AZURE_ASYNC_OPERATION)
            .map(Self::AsyncOperation)
            .or_else(|| header(LOCATION.as_str()).map(Self::Location))
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::AsyncOperation(url) | Self::Location(url) => url,
        }
    }
}

/// `Retry-After` as a delay, when given in whole seconds
#[must_use]
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl ArmClient {
    /// Poll `target` until the operation is terminal or the operation timeout elapses
    ///
    /// # Errors
    /// - `ClientError::OperationFailed` when the operation reports `Failed` or `Canceled`
    /// - `ClientError::OperationTimedOut` when the timeout elapses first
    /// - any error returned by a status request
    pub(crate) async fn wait_for_completion(
        &self,
        target: PollTarget,
        initial_delay: Option<Duration>,
    ) -> Result<(), ClientError> {
        let started = Instant::now();
        let mut backoff = FibonacciBackoff::new(self.poll.min_interval, self.poll.max_interval);
        let mut delay = initial_delay.unwrap_or_else(|| backoff.next_backoff());
        let mut polls: u32 = 0;

        loop {
            tokio::time::sleep(delay).await;
            polls += 1;
            metrics::increment_lro_polls();

            let response = self
                .make_request(Method::GET, target.url(), None)
                .await?
                .send()
                .await?;
            let status = response.status();
            let next_retry = retry_after(response.headers());

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(self.handle_error_response(&Method::GET, target.url(), status, &body));
            }

            match &target {
                PollTarget::AsyncOperation(url) => {
                    let body = response.text().await?;
                    let operation: OperationStatus = serde_json::from_str(&body)
                        .map_err(|source| ClientError::Decode {
                            url: url.clone(),
                            source,
                        })?;
                    match operation.status.as_str() {
                        "Succeeded" => {
                            info!(polls, "Operation completed");
                            return Ok(());
                        }
                        "Failed" | "Canceled" => {
                            let message = operation
                                .error
                                .map(|e| format!("{}: {}", e.code, e.message))
                                .unwrap_or_default();
                            warn!(status = %operation.status, %message, "Operation did not succeed");
                            return Err(ClientError::OperationFailed {
                                url: url.clone(),
                                status: operation.status,
                                message,
                            });
                        }
                        other => debug!(polls, status = other, "Operation still running"),
                    }
                }
                PollTarget::Location(_) => {
                    if status != StatusCode::ACCEPTED {
                        info!(polls, "Operation completed");
                        return Ok(());
                    }
                    debug!(polls, "Operation still running");
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.poll.timeout {
                warn!(polls, ?elapsed, url = target.url(), "Gave up waiting for operation");
                return Err(ClientError::OperationTimedOut {
                    url: target.url().to_string(),
                    elapsed,
                });
            }
            delay = next_retry
                .unwrap_or_else(|| backoff.next_backoff())
                .min(self.poll.timeout - elapsed);
        }
    }
}
