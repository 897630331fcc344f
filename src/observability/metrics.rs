//! # Metrics
//!
//! Prometheus metrics for the management client and the scenarios.
//!
//! ## Metrics Exposed
//!
//! - `keyvault_recovery_operations_total` - Management API operations by operation name
//! - `keyvault_recovery_operation_duration_seconds` - Duration of management API operations
//! - `keyvault_recovery_operation_errors_total` - Failed operations by operation name and status
//! - `keyvault_recovery_lro_polls_total` - Long-running operation status polls
//! - `keyvault_recovery_readiness_polls_total` - Readiness polls after vault creation
//! - `keyvault_recovery_scenario_runs_total` - Scenario runs by scenario and outcome
//! - `keyvault_recovery_scenario_duration_seconds` - Duration of scenario runs

use anyhow::{Context, Result};
use prometheus::core::Collector;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "keyvault_recovery_operations_total",
            "Total number of management API operations by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create OPERATIONS_TOTAL metric - this should never happen")
});

static OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "keyvault_recovery_operation_duration_seconds",
            "Duration of management API operations in seconds by operation",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        &["operation"],
    )
    .expect("Failed to create OPERATION_DURATION metric - this should never happen")
});

static OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "keyvault_recovery_operation_errors_total",
            "Total number of failed management API operations by operation and status",
        ),
        &["operation", "status"],
    )
    .expect("Failed to create OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static LRO_POLLS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "keyvault_recovery_lro_polls_total",
        "Total number of long-running operation status polls",
    )
    .expect("Failed to create LRO_POLLS_TOTAL metric - this should never happen")
});

static READINESS_POLLS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "keyvault_recovery_readiness_polls_total",
        "Total number of readiness polls after vault creation",
    )
    .expect("Failed to create READINESS_POLLS_TOTAL metric - this should never happen")
});

static SCENARIO_RUNS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "keyvault_recovery_scenario_runs_total",
            "Total number of scenario runs by scenario and outcome",
        ),
        &["scenario", "outcome"],
    )
    .expect("Failed to create SCENARIO_RUNS_TOTAL metric - this should never happen")
});

static SCENARIO_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "keyvault_recovery_scenario_duration_seconds",
            "Duration of scenario runs in seconds by scenario",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["scenario"],
    )
    .expect("Failed to create SCENARIO_DURATION metric - this should never happen")
});

/// Register all metrics with the registry
///
/// Registering twice is not an error.
pub fn register_metrics() -> Result<()> {
    register(Box::new(OPERATIONS_TOTAL.clone()))?;
    register(Box::new(OPERATION_DURATION.clone()))?;
    register(Box::new(OPERATION_ERRORS_TOTAL.clone()))?;
    register(Box::new(LRO_POLLS_TOTAL.clone()))?;
    register(Box::new(READINESS_POLLS_TOTAL.clone()))?;
    register(Box::new(SCENARIO_RUNS_TOTAL.clone()))?;
    register(Box::new(SCENARIO_DURATION.clone()))?;

    Ok(())
}

fn register(collector: Box<dyn Collector>) -> Result<()> {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub fn record_operation(operation: &str, duration: f64) {
    OPERATIONS_TOTAL.with_label_values(&[operation]).inc();
    OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_operation_errors(operation: &str, status: &str) {
    OPERATION_ERRORS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}

pub fn increment_lro_polls() {
    LRO_POLLS_TOTAL.inc();
}

pub fn increment_readiness_polls() {
    READINESS_POLLS_TOTAL.inc();
}

pub fn record_scenario_run(scenario: &str, outcome: &str, duration: f64) {
    SCENARIO_RUNS_TOTAL
        .with_label_values(&[scenario, outcome])
        .inc();
    SCENARIO_DURATION
        .with_label_values(&[scenario])
        .observe(duration);
}

/// Render every registered metric in the Prometheus text format
pub fn gather_text() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not valid UTF-8")
}
