//! # Observability
//!
//! - `metrics`: Prometheus metrics collection
//! - [`init_tracing`]: `tracing` subscriber setup for the binary

pub mod metrics;

/// Install the global `tracing` subscriber
///
/// Honours `RUST_LOG`; defaults to `keyvault_recovery=info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keyvault_recovery=info".into()),
        )
        .with_target(false)
        .init();
}
