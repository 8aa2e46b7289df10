//! Bootstrap orchestration for one identity.
//!
//! One bounded, iterative retry loop per identity. Each attempt checks
//! whether the directory record exists, creates it when absent, and then
//! verifies that every expected secret has become visible. Any partial
//! failure inside an attempt is logged and absorbed; only an exhausted
//! retry budget surfaces as an error, and that error must abort start-up.
//!
//! The inter-attempt delay races against the shutdown signal so a
//! restarting process never blocks on a sleeping bootstrap. An
//! interrupted sleep abandons the bootstrap with a warning; it is not a
//! failure.

use tracing::{debug, info, warn};

use crate::error::{Result, SeedError};
use crate::manifest::IdentityManifest;
use crate::settings::RetrySettings;
use crate::shutdown::ShutdownSignal;
use crate::store::{CreateOutcome, IdentityDirectory, SecretStore};
use crate::verify::SecretVerifier;

/// Where a bootstrap run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The identity exists and all expected secrets are visible
    Succeeded {
        /// Attempts consumed, starting at 1
        attempts: u32,
    },
    /// Shutdown was signalled during the inter-attempt delay
    Interrupted,
}

/// Drives one identity from "maybe absent" to "created with all secrets
/// visible".
pub struct BootstrapOrchestrator<'a> {
    directory: &'a dyn IdentityDirectory,
    secrets: &'a dyn SecretStore,
    retry: RetrySettings,
}

impl<'a> BootstrapOrchestrator<'a> {
    /// Build an orchestrator; the retry bounds are fixed for its lifetime.
    pub fn new(
        directory: &'a dyn IdentityDirectory,
        secrets: &'a dyn SecretStore,
        retry: RetrySettings,
    ) -> Self {
        Self {
            directory,
            secrets,
            retry,
        }
    }

    /// Run the bootstrap loop for one identity.
    ///
    /// Returns [`BootstrapOutcome::Succeeded`] once a verification pass
    /// sees every secret, [`BootstrapOutcome::Interrupted`] when shutdown
    /// fires during the delay, and [`SeedError::BootstrapExhausted`] when
    /// the retry budget runs out.
    pub async fn run(
        &self,
        manifest: &IdentityManifest,
        shutdown: &mut ShutdownSignal,
    ) -> Result<BootstrapOutcome> {
        let identity_id = &manifest.identity_id;
        let max_retries = self.retry.max_retries.max(1);

        for attempt in 1..=max_retries {
            debug!("bootstrap attempt {attempt}/{max_retries} for '{identity_id}'");

            if self.try_bootstrap(manifest).await {
                info!("bootstrap complete for '{identity_id}' after {attempt} attempt(s)");
                return Ok(BootstrapOutcome::Succeeded { attempts: attempt });
            }

            if attempt < max_retries {
                info!(
                    "waiting {}ms before bootstrap retry for '{identity_id}'",
                    self.retry.retry_delay.as_millis()
                );
                tokio::select! {
                    _ = tokio::time::sleep(self.retry.retry_delay) => {}
                    _ = shutdown.triggered() => {
                        warn!("bootstrap interrupted for '{identity_id}'");
                        return Ok(BootstrapOutcome::Interrupted);
                    }
                }
            }
        }

        Err(SeedError::BootstrapExhausted {
            identity_id: identity_id.clone(),
            attempts: max_retries,
        })
    }

    /// One attempt: check, create when absent, verify. Returns whether
    /// every expected secret is visible.
    async fn try_bootstrap(&self, manifest: &IdentityManifest) -> bool {
        let identity_id = &manifest.identity_id;
        info!("checking whether identity '{identity_id}' already exists");

        match self.directory.get(identity_id).await {
            Ok(Some(_)) => {
                info!("identity '{identity_id}' already exists");
                self.verify_secrets(identity_id).await
            }
            Ok(None) => {
                info!("identity '{identity_id}' does not exist, creating");
                if self.create(manifest).await {
                    self.verify_secrets(identity_id).await
                } else {
                    false
                }
            }
            Err(e) => {
                warn!("directory lookup failed for '{identity_id}': {e}");
                false
            }
        }
    }

    /// Create the identity. A conflict means another creator won the
    /// race; that is equivalent to "already exists" and verification
    /// proceeds.
    async fn create(&self, manifest: &IdentityManifest) -> bool {
        let identity_id = &manifest.identity_id;
        match self.directory.create(manifest).await {
            Ok(CreateOutcome::Created(created)) => {
                debug!(
                    "identity '{identity_id}' created, API key generated with length {}",
                    created.api_key.len()
                );
                true
            }
            Ok(CreateOutcome::Conflict) => {
                info!("identity '{identity_id}' was created concurrently, continuing to verification");
                true
            }
            Err(e) => {
                warn!("failed to create identity '{identity_id}': {e}");
                false
            }
        }
    }

    async fn verify_secrets(&self, identity_id: &str) -> bool {
        match SecretVerifier::new(self.directory, self.secrets)
            .verify(identity_id)
            .await
        {
            Ok(visibility) if visibility.all_present() => true,
            Ok(_) => {
                warn!("secrets not yet visible for '{identity_id}'");
                false
            }
            Err(e) => {
                warn!("secret verification failed for '{identity_id}': {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestBuilder;
    use crate::settings::ManifestSettings;
    use crate::settings::RetrySettings;
    use crate::shutdown;
    use crate::store::{InMemoryDirectory, InMemoryDocumentStore, InMemorySecretStore};
    use std::time::Duration;

    fn fast_retry(max_retries: u32) -> RetrySettings {
        RetrySettings {
            max_retries,
            retry_delay: Duration::from_millis(5),
        }
    }

    fn manifest(id: &str) -> IdentityManifest {
        ManifestBuilder::new(ManifestSettings::default()).tenant_manifest(id)
    }

    #[tokio::test]
    async fn test_create_then_verify_on_first_attempt() {
        let secrets = InMemorySecretStore::new();
        let directory = InMemoryDirectory::new(secrets.clone(), InMemoryDocumentStore::new());
        let orchestrator = BootstrapOrchestrator::new(&directory, &secrets, fast_retry(5));

        let (_handle, mut signal) = shutdown::channel();
        let outcome = orchestrator
            .run(&manifest("p1"), &mut signal)
            .await
            .unwrap();

        assert_eq!(outcome, BootstrapOutcome::Succeeded { attempts: 1 });
        assert_eq!(directory.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_exhausts_budget_when_secrets_never_appear() {
        let secrets = InMemorySecretStore::new();
        let directory = InMemoryDirectory::with_deferred_secrets(
            secrets.clone(),
            InMemoryDocumentStore::new(),
        );
        let orchestrator = BootstrapOrchestrator::new(&directory, &secrets, fast_retry(3));

        let (_handle, mut signal) = shutdown::channel();
        let err = orchestrator
            .run(&manifest("p1"), &mut signal)
            .await
            .unwrap_err();

        match err {
            SeedError::BootstrapExhausted {
                identity_id,
                attempts,
            } => {
                assert_eq!(identity_id, "p1");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_error_message_names_identity_and_attempts() {
        let err = SeedError::BootstrapExhausted {
            identity_id: "p1".to_string(),
            attempts: 5,
        };
        let message = err.to_string();
        assert!(message.contains("p1"));
        assert!(message.contains("after 5 attempts"));
    }
}
