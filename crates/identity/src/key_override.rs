//! Operator key-override propagation.
//!
//! When an override private key is configured, it must reach three
//! independently-owned stores: the secret store, the identity's DID
//! document, and the relational key-pair row. There is no transaction
//! spanning them and no compensation; every step is independently
//! fallible, logged, and recorded in a per-step report so a partial
//! failure is visible for exactly what it is. Recovery is observational:
//! the next bootstrap pass re-checks the secret-store side, the other
//! two sides are reconciled out of band.

use tracing::{info, warn};

use crate::alias::{self, SecretKind};
use crate::document::{VerificationMethod, METHOD_TYPE_JSON_WEB_KEY};
use crate::jwk::{self, Jwk};
use crate::settings::OverridePolicy;
use crate::store::{DocumentStore, IdentityDirectory, KeyPairDatabase, SecretStore};

/// Outcome of one propagation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step ran and succeeded
    Completed,
    /// Step ran and succeeded, with a logged caveat
    Warned(String),
    /// Step ran and failed; dependent steps are skipped
    Failed(String),
    /// Step was not attempted because a prerequisite failed
    Skipped,
}

impl StepOutcome {
    /// Whether the step ran without failing.
    pub fn succeeded(&self) -> bool {
        matches!(self, StepOutcome::Completed | StepOutcome::Warned(_))
    }
}

/// Per-step record of one propagation run for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationReport {
    /// Identity the override was applied to
    pub identity_id: String,
    /// Format check on the override value
    pub format_check: StepOutcome,
    /// Write to the secret store
    pub secret_write: StepOutcome,
    /// Parse of the override as a JWK
    pub jwk_parse: StepOutcome,
    /// Verification-method rewrite in the DID document
    pub document_update: StepOutcome,
    /// Publication of the updated document
    pub document_publish: StepOutcome,
    /// Relational key-pair row update
    pub keypair_row: StepOutcome,
}

impl PropagationReport {
    fn pending(identity_id: &str) -> Self {
        Self {
            identity_id: identity_id.to_string(),
            format_check: StepOutcome::Skipped,
            secret_write: StepOutcome::Skipped,
            jwk_parse: StepOutcome::Skipped,
            document_update: StepOutcome::Skipped,
            document_publish: StepOutcome::Skipped,
            keypair_row: StepOutcome::Skipped,
        }
    }

    /// Whether every step ran and succeeded.
    pub fn fully_applied(&self) -> bool {
        self.format_check.succeeded()
            && self.secret_write.succeeded()
            && self.jwk_parse.succeeded()
            && self.document_update.succeeded()
            && self.document_publish.succeeded()
            && self.keypair_row.succeeded()
    }
}

/// Propagates an override private key across the three backing stores.
pub struct KeyOverridePropagator<'a> {
    directory: &'a dyn IdentityDirectory,
    secrets: &'a dyn SecretStore,
    documents: &'a dyn DocumentStore,
    keypairs: &'a KeyPairDatabase,
    policy: OverridePolicy,
}

impl<'a> KeyOverridePropagator<'a> {
    /// Build a propagator over the three stores and the directory.
    pub fn new(
        directory: &'a dyn IdentityDirectory,
        secrets: &'a dyn SecretStore,
        documents: &'a dyn DocumentStore,
        keypairs: &'a KeyPairDatabase,
        policy: OverridePolicy,
    ) -> Self {
        Self {
            directory,
            secrets,
            documents,
            keypairs,
            policy,
        }
    }

    /// Apply the override for one identity. Never returns an error: every
    /// failure is absorbed into the report, so one identity's trouble
    /// cannot abort the rest of a batch.
    pub async fn propagate(&self, identity_id: &str, override_value: &str) -> PropagationReport {
        let mut report = PropagationReport::pending(identity_id);
        info!("applying key override for identity '{identity_id}'");

        // Step 1: advisory format check, policy decides what a failure means.
        if jwk::override_has_expected_format(override_value) {
            report.format_check = StepOutcome::Completed;
        } else {
            warn!(
                "override for '{identity_id}' has invalid format; \
                 expected 'base64(<identity id>).<random suffix>'"
            );
            match self.policy {
                OverridePolicy::Reject => {
                    warn!("override policy is 'reject', skipping propagation for '{identity_id}'");
                    report.format_check = StepOutcome::Failed("invalid format".to_string());
                    return report;
                }
                OverridePolicy::Warn => {
                    report.format_check = StepOutcome::Warned("invalid format".to_string());
                }
            }
        }

        // Step 2: overwrite the stored secret. The alias comes from the
        // directory record when it can be read, otherwise from the
        // deterministic derivation.
        report.secret_write = self.write_secret(identity_id, override_value).await;

        // Step 3: parse the override as a JWK. Without a parseable public
        // part there is nothing to push to the document or the database.
        let parsed = match Jwk::parse(override_value) {
            Ok(parsed) => {
                report.jwk_parse = StepOutcome::Completed;
                parsed
            }
            Err(e) => {
                warn!(
                    "override for '{identity_id}' is not a parseable JWK ({e}); \
                     skipping document and database propagation"
                );
                report.jwk_parse = StepOutcome::Failed(e.to_string());
                return report;
            }
        };
        let public = parsed.public_only();

        // Steps 4 and 5: document rewrite, then publish.
        let (update, publish) = self.update_document(identity_id, &public).await;
        report.document_update = update;
        report.document_publish = publish;

        // Step 6: relational row, isolated from the document outcome.
        report.keypair_row = self.update_keypair_row(identity_id, &public);

        report
    }

    async fn write_secret(&self, identity_id: &str, override_value: &str) -> StepOutcome {
        let secret_alias = match self.directory.get(identity_id).await {
            Ok(Some(record)) => record.api_key_alias,
            Ok(None) => {
                warn!(
                    "no directory record for '{identity_id}', \
                     storing override under the derived alias"
                );
                alias::alias_for(identity_id, SecretKind::ApiKey)
            }
            Err(e) => {
                warn!(
                    "failed to read directory record for '{identity_id}' ({e}), \
                     storing override under the derived alias"
                );
                alias::alias_for(identity_id, SecretKind::ApiKey)
            }
        };

        match self.secrets.store(&secret_alias, override_value).await {
            Ok(()) => {
                info!("override stored for '{identity_id}' (alias: {secret_alias})");
                StepOutcome::Completed
            }
            Err(e) => {
                warn!("failed to store override for '{identity_id}': {e}");
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    /// Rewrite the verification method and authentication entry, then
    /// publish. A missing document or a failed update stops the document
    /// side only; a failed publish does not roll back the update.
    async fn update_document(
        &self,
        identity_id: &str,
        public: &Jwk,
    ) -> (StepOutcome, StepOutcome) {
        let mut document = match self.documents.query(identity_id).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                warn!("no DID document found for '{identity_id}'");
                return (
                    StepOutcome::Failed("no document".to_string()),
                    StepOutcome::Skipped,
                );
            }
            Err(e) => {
                warn!("document query failed for '{identity_id}': {e}");
                return (StepOutcome::Failed(e.to_string()), StepOutcome::Skipped);
            }
        };

        let method_id = alias::verification_method_id(identity_id);
        let mut jwk = public.clone();
        if jwk.kid.is_none() {
            jwk.kid = Some(method_id.clone());
        }
        document.replace_verification_method(VerificationMethod {
            id: method_id,
            method_type: METHOD_TYPE_JSON_WEB_KEY.to_string(),
            controller: document.id.clone(),
            public_key_jwk: jwk,
        });

        if let Err(e) = self.documents.update(&document).await {
            warn!("failed to update DID document for '{identity_id}': {e}");
            return (StepOutcome::Failed(e.to_string()), StepOutcome::Skipped);
        }
        info!("DID document updated for '{identity_id}'");

        match self.documents.publish(&document.id).await {
            Ok(()) => {
                info!("DID document republished for '{identity_id}'");
                (StepOutcome::Completed, StepOutcome::Completed)
            }
            Err(e) => {
                warn!("failed to publish DID document for '{identity_id}': {e}");
                (StepOutcome::Completed, StepOutcome::Failed(e.to_string()))
            }
        }
    }

    /// Rewrite the relational row with the public-only key. Every failure
    /// is caught here; nothing escapes to abort sibling identities.
    fn update_keypair_row(&self, identity_id: &str, public: &Jwk) -> StepOutcome {
        let json = match public.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialize public JWK for '{identity_id}': {e}");
                return StepOutcome::Failed(e.to_string());
            }
        };

        match self.keypairs.update_public_key(identity_id, &json) {
            Ok(0) => {
                warn!("no key-pair row matched identity '{identity_id}'");
                StepOutcome::Warned("no rows matched".to_string())
            }
            Ok(updated) => {
                info!("updated {updated} key-pair row(s) for '{identity_id}'");
                StepOutcome::Completed
            }
            Err(e) => {
                warn!("failed to update key-pair row for '{identity_id}': {e}");
                StepOutcome::Failed(e.to_string())
            }
        }
    }
}
