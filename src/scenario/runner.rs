//! # Scenario Runner
//!
//! Drives a vault through create → delete → recover → delete → purge and
//! checks the provider's post-conditions after each step.
//!
//! Steps run strictly in order; the first failure aborts the scenario and
//! leaves the remote resources in whatever state the last successful step
//! produced.

use super::assertions::assert_absent;
use super::readiness::wait_until_ready;
use super::{ScenarioKind, ScenarioReport, StepRecord};
use crate::config::SampleConfig;
use crate::error::ScenarioError;
use crate::observability::metrics;
use crate::provider::{
    AccessPolicyEntry, CreateMode, DeletedVault, Lookup, ResourceId, Sku, Vault,
    VaultCreateOrUpdateParameters, VaultManagement, VaultPatchParameters, VaultPatchProperties,
    VaultProperties,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};

/// Runs scenarios against a [`VaultManagement`] implementation
pub struct ScenarioRunner {
    client: Arc<dyn VaultManagement>,
    config: SampleConfig,
}

impl std::fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Run one step, logging its start and completion and recording its duration
async fn step<T, E, F>(
    steps: &mut Vec<StepRecord>,
    description: &'static str,
    operation: F,
) -> anyhow::Result<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<anyhow::Error>,
{
    let number = steps.len() + 1;
    info!(step = number, "{description}...");
    let start = Instant::now();

    match operation.await {
        Ok(value) => {
            let duration = start.elapsed();
            info!(step = number, ?duration, "{description}... done");
            steps.push(StepRecord {
                number,
                description,
                duration,
            });
            Ok(value)
        }
        Err(e) => {
            let e = e.into().context(format!("Step {number}: {description}"));
            error!(step = number, "Unexpected failure: {e:#}");
            Err(e)
        }
    }
}

fn ensure_name(vault: &Vault, expected: &str) -> Result<(), ScenarioError> {
    if vault.name.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ScenarioError::NameMismatch {
            expected: expected.to_string(),
            actual: vault.name.clone(),
        })
    }
}

fn require_deleted_record(
    lookup: Lookup<DeletedVault>,
    name: &str,
) -> Result<DeletedVault, ScenarioError> {
    lookup.found().ok_or_else(|| ScenarioError::DeletedRecordMissing {
        name: name.to_string(),
    })
}

impl ScenarioRunner {
    pub fn new(client: Arc<dyn VaultManagement>, config: SampleConfig) -> Self {
        Self { client, config }
    }

    /// Run the given scenarios in order, stopping at the first failure
    ///
    /// # Errors
    /// Returns the error of the first failing scenario
    pub async fn run_all(&self, kinds: &[ScenarioKind]) -> anyhow::Result<Vec<ScenarioReport>> {
        let mut reports = Vec::with_capacity(kinds.len());
        for kind in kinds {
            reports.push(self.run(*kind).await?);
        }
        Ok(reports)
    }

    /// Run a single scenario
    ///
    /// # Errors
    /// Returns the first failing step's error, with the step as context
    pub async fn run(&self, kind: ScenarioKind) -> anyhow::Result<ScenarioReport> {
        let span = info_span!(
            "scenario",
            scenario = kind.as_str(),
            vault.name = self.config.vault_name.as_str(),
            resource_group.name = self.config.resource_group.as_str()
        );
        async move {
            info!("Starting {kind} scenario");
            let start = Instant::now();
            let result = self.run_steps(kind).await;
            let elapsed = start.elapsed();

            let outcome = if result.is_ok() { "success" } else { "failure" };
            metrics::record_scenario_run(kind.as_str(), outcome, elapsed.as_secs_f64());
            match &result {
                Ok(report) => info!(
                    steps = report.steps.len(),
                    ?elapsed,
                    "Scenario {kind} completed"
                ),
                Err(e) => error!(?elapsed, "Scenario {kind} failed: {e:#}"),
            }
            result
        }
        .instrument(span)
        .await
    }

    fn create_parameters(&self, soft_delete: bool) -> VaultCreateOrUpdateParameters {
        let config = &self.config;
        let mut properties = VaultProperties::new(&config.tenant_id, Sku::standard())
            .with_soft_delete(soft_delete)
            .with_create_mode(CreateMode::Default);
        if let Some(object_id) = &config.object_id {
            properties =
                properties.with_access_policy(AccessPolicyEntry::for_operator(&config.tenant_id, object_id));
        }
        VaultCreateOrUpdateParameters::new(&config.location, properties)
    }

    async fn run_steps(&self, kind: ScenarioKind) -> anyhow::Result<ScenarioReport> {
        let client = self.client.as_ref();
        let config = &self.config;
        let name = config.vault_name.as_str();
        let resource_group = config.resource_group.as_str();
        let vault_id = ResourceId::vault(client.subscription_id(), resource_group, name);
        let deleted_id =
            ResourceId::deleted_vault(client.subscription_id(), &config.location, name);
        let started = Instant::now();
        let mut steps = Vec::new();

        step(
            &mut steps,
            "Ensuring resource group exists",
            client.create_or_update_resource_group(resource_group, &config.location),
        )
        .await?;

        let parameters = self.create_parameters(kind.soft_delete_at_creation());
        step(&mut steps, "Creating vault", async {
            let vault = client
                .create_or_update_vault(resource_group, name, &parameters)
                .await?;
            ensure_name(&vault, name)?;
            info!(
                vault.id = vault.id.as_str(),
                soft_delete = vault.soft_delete_enabled(),
                "Created vault"
            );
            Ok::<_, anyhow::Error>(vault)
        })
        .await?;

        step(
            &mut steps,
            "Waiting for vault to become ready",
            wait_until_ready(client, &vault_id, &config.readiness),
        )
        .await?;

        let mut vault = step(&mut steps, "Fetching vault", async {
            let vault = client.get_vault(&vault_id).await?;
            ensure_name(&vault, name)?;
            Ok::<_, anyhow::Error>(vault)
        })
        .await?;

        let mut soft_delete_retrofitted = false;
        if kind == ScenarioKind::ExistingVault {
            vault.properties.enable_soft_delete = Some(true);
            let patch = VaultPatchParameters {
                properties: VaultPatchProperties {
                    enable_soft_delete: vault.properties.enable_soft_delete,
                    ..VaultPatchProperties::default()
                },
            };
            step(&mut steps, "Enabling soft delete on existing vault", async {
                let updated = client.update_vault(resource_group, name, &patch).await?;
                if !updated.soft_delete_enabled() {
                    return Err(anyhow::Error::from(ScenarioError::SoftDeleteNotEnabled {
                        name: name.to_string(),
                    }));
                }
                Ok::<_, anyhow::Error>(updated)
            })
            .await?;
            soft_delete_retrofitted = true;
        }

        step(&mut steps, "Deleting vault", client.delete_vault(&vault_id)).await?;

        let record = step(&mut steps, "Fetching deleted vault record", async {
            let lookup = Lookup::from_result(client.get_deleted_vault(&deleted_id).await)?;
            let record = require_deleted_record(lookup, name)?;
            info!(
                deleted_on = ?record.deleted_on(),
                scheduled_purge_on = ?record.scheduled_purge_on(),
                "Found deleted vault record"
            );
            Ok::<_, anyhow::Error>(record)
        })
        .await?;

        step(
            &mut steps,
            "Recovering deleted vault",
            client.recover_vault(resource_group, name, &config.location, &config.tenant_id),
        )
        .await?;

        step(&mut steps, "Fetching recovered vault", async {
            let vault = client.get_vault(&vault_id).await?;
            ensure_name(&vault, name)?;
            Ok::<_, anyhow::Error>(vault)
        })
        .await?;

        step(&mut steps, "Deleting vault again", client.delete_vault(&vault_id)).await?;

        step(&mut steps, "Purging deleted vault", async {
            let lookup = Lookup::from_result(client.get_deleted_vault(&deleted_id).await)?;
            require_deleted_record(lookup, name)?;
            client.purge_deleted_vault(&deleted_id).await?;
            Ok::<_, anyhow::Error>(())
        })
        .await?;

        step(&mut steps, "Verifying vault is gone", async {
            assert_absent(client.get_vault(&vault_id).await, &format!("vault {name}"))
        })
        .await?;

        step(&mut steps, "Verifying deleted vault record is gone", async {
            assert_absent(
                client.get_deleted_vault(&deleted_id).await,
                &format!("deleted vault record {name}"),
            )
        })
        .await?;

        Ok(ScenarioReport {
            kind,
            vault_id: vault_id.to_string(),
            steps,
            deleted_on: record.deleted_on(),
            scheduled_purge_on: record.scheduled_purge_on(),
            soft_delete_retrofitted,
            elapsed: started.elapsed(),
        })
    }
}
