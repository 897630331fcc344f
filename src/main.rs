//! # keyvault-recovery
//!
//! Command-line front end for the Key Vault recovery scenarios.
//!
//! ## Usage
//!
//! ```bash
//! # Soft delete enabled at creation
//! keyvault-recovery new-vault
//!
//! # Soft delete enabled after creation
//! keyvault-recovery existing-vault
//!
//! # Both, in order, against the same names
//! keyvault-recovery all
//!
//! # Against the in-memory provider, dumping metrics at exit
//! keyvault-recovery --dry-run --print-metrics all
//! ```
//!
//! Configuration is read from the environment (and `.env` when present);
//! see [`SampleConfig::from_lookup`] for the variables.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keyvault_recovery::observability::{self, metrics};
use keyvault_recovery::provider::azure::ArmClient;
use keyvault_recovery::provider::memory::InMemoryVaultManagement;
use keyvault_recovery::provider::VaultManagement;
use keyvault_recovery::{SampleConfig, ScenarioKind, ScenarioRunner};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Azure Key Vault soft-delete and recovery scenarios
#[derive(Parser)]
#[command(name = "keyvault-recovery", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Run against an in-memory simulation instead of Azure
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print Prometheus metrics to stdout when finished
    #[arg(long, global = true)]
    print_metrics: bool,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Create a vault with soft delete enabled, then delete, recover and purge it
    NewVault,
    /// Create a vault without soft delete, enable it, then delete, recover and purge it
    ExistingVault,
    /// Run both scenarios in order
    All,
}

impl Commands {
    fn scenarios(self) -> Vec<ScenarioKind> {
        match self {
            Self::NewVault => vec![ScenarioKind::NewVault],
            Self::ExistingVault => vec![ScenarioKind::ExistingVault],
            Self::All => ScenarioKind::ALL.to_vec(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure rustls crypto provider before any TLS client is built
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|provider| {
            anyhow::anyhow!("Failed to install rustls crypto provider: {provider:?}")
        })?;

    let dotenv = dotenvy::dotenv();
    observability::init_tracing();
    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    }

    let cli = Cli::parse();
    metrics::register_metrics()?;

    let mut config = SampleConfig::from_env().context("Failed to load configuration")?;

    let client: Arc<dyn VaultManagement> = if cli.dry_run {
        info!("Dry run: using in-memory provider");
        config.readiness.check_dns = false;
        Arc::new(InMemoryVaultManagement::new(&config.subscription_id))
    } else {
        Arc::new(ArmClient::new(&config).context("Failed to create management client")?)
    };

    let runner = ScenarioRunner::new(client, config);
    let result = runner.run_all(&cli.command.scenarios()).await;

    if cli.print_metrics {
        print!("{}", metrics::gather_text()?);
    }

    for report in result? {
        info!(
            scenario = %report.kind,
            vault.id = report.vault_id.as_str(),
            steps = report.steps.len(),
            deleted_on = ?report.deleted_on,
            scheduled_purge_on = ?report.scheduled_purge_on,
            soft_delete_retrofitted = report.soft_delete_retrofitted,
            elapsed = ?report.elapsed,
            "Scenario passed"
        );
    }
    Ok(())
}
