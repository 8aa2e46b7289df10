//! Start-up seeding: super identity first, then the tenant batch.
//!
//! The super identity must bootstrap or start-up fails. Tenants with
//! invalid manifests are logged and skipped; a tenant whose retry budget
//! runs out is fatal like the super identity, because a half-provisioned
//! deployment must not start serving. After bootstrap, a configured key
//! override is propagated to every seeded identity.

use tracing::{info, warn};

use crate::bootstrap::{BootstrapOrchestrator, BootstrapOutcome};
use crate::error::Result;
use crate::key_override::{KeyOverridePropagator, PropagationReport};
use crate::manifest::{validate_manifest, ManifestBuilder};
use crate::settings::SeedSettings;
use crate::shutdown::ShutdownSignal;
use crate::store::{DocumentStore, IdentityDirectory, KeyPairDatabase, SecretStore};

/// What a completed (or interrupted) seeding pass did.
#[derive(Debug, Clone, Default)]
pub struct SeedSummary {
    /// Identities that reached full secret visibility
    pub bootstrapped: Vec<String>,
    /// Identities skipped because their manifest failed validation
    pub skipped: Vec<String>,
    /// Whether shutdown interrupted the pass before it finished
    pub interrupted: bool,
    /// Per-identity override propagation reports, when an override is set
    pub override_reports: Vec<PropagationReport>,
}

/// Drives the whole seeding pass against a set of stores.
pub struct Seeder<'a> {
    directory: &'a dyn IdentityDirectory,
    secrets: &'a dyn SecretStore,
    documents: &'a dyn DocumentStore,
    keypairs: &'a KeyPairDatabase,
    settings: SeedSettings,
}

impl<'a> Seeder<'a> {
    /// Build a seeder over immutable settings and the four stores.
    pub fn new(
        directory: &'a dyn IdentityDirectory,
        secrets: &'a dyn SecretStore,
        documents: &'a dyn DocumentStore,
        keypairs: &'a KeyPairDatabase,
        settings: SeedSettings,
    ) -> Self {
        Self {
            directory,
            secrets,
            documents,
            keypairs,
            settings,
        }
    }

    /// Run the seeding pass. Only an exhausted retry budget returns an
    /// error; an interrupted pass returns the partial summary.
    pub async fn run(&self, shutdown: &mut ShutdownSignal) -> Result<SeedSummary> {
        let builder = ManifestBuilder::new(self.settings.manifest.clone());
        let orchestrator =
            BootstrapOrchestrator::new(self.directory, self.secrets, self.settings.retry);
        let mut summary = SeedSummary::default();

        let super_manifest = builder.super_manifest(
            &self.settings.super_identity_id,
            self.settings.super_identity_did.as_deref(),
        );
        info!("seeding super identity '{}'", super_manifest.identity_id);
        match orchestrator.run(&super_manifest, shutdown).await? {
            BootstrapOutcome::Succeeded { .. } => {
                summary.bootstrapped.push(super_manifest.identity_id.clone());
            }
            BootstrapOutcome::Interrupted => {
                summary.interrupted = true;
                return Ok(summary);
            }
        }

        for manifest in builder.tenant_manifests(&self.settings.identity_ids) {
            if let Err(e) = validate_manifest(&manifest) {
                warn!("skipping identity: {e}");
                summary.skipped.push(manifest.identity_id.clone());
                continue;
            }

            info!("seeding identity '{}'", manifest.identity_id);
            match orchestrator.run(&manifest, shutdown).await? {
                BootstrapOutcome::Succeeded { .. } => {
                    summary.bootstrapped.push(manifest.identity_id.clone());
                }
                BootstrapOutcome::Interrupted => {
                    summary.interrupted = true;
                    return Ok(summary);
                }
            }
        }

        if let Some(override_value) = &self.settings.override_private_key {
            warn!("key override is enabled; this should only be used for testing");
            let propagator = KeyOverridePropagator::new(
                self.directory,
                self.secrets,
                self.documents,
                self.keypairs,
                self.settings.override_policy,
            );
            for identity_id in &summary.bootstrapped {
                let report = propagator.propagate(identity_id, override_value).await;
                summary.override_reports.push(report);
            }
        }

        info!(
            "seeding finished: {} bootstrapped, {} skipped",
            summary.bootstrapped.len(),
            summary.skipped.len()
        );
        Ok(summary)
    }
}
