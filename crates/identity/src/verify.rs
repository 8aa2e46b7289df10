//! Secret visibility verification.
//!
//! After an identity is created, the platform materializes its secrets
//! into the secret store asynchronously. One verification pass checks the
//! fixed set of expected aliases and reports how many are visible; it
//! never retries on its own; retrying is the orchestrator's job.

use tracing::{debug, info, warn};

use crate::alias::{self, SecretKind};
use crate::error::{Result, SeedError};
use crate::store::{IdentityDirectory, SecretStore};

/// Result of one visibility pass over an identity's expected secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretVisibility {
    /// Secrets present and non-empty
    pub found: u32,
    /// Secrets absent or empty
    pub missing: u32,
}

impl SecretVisibility {
    /// Whether every expected secret is visible.
    pub fn all_present(&self) -> bool {
        self.missing == 0
    }
}

/// Checks the three expected secrets of an identity.
pub struct SecretVerifier<'a> {
    directory: &'a dyn IdentityDirectory,
    secrets: &'a dyn SecretStore,
}

impl<'a> SecretVerifier<'a> {
    /// Build a verifier over the directory and secret store.
    pub fn new(directory: &'a dyn IdentityDirectory, secrets: &'a dyn SecretStore) -> Self {
        Self { directory, secrets }
    }

    /// One pass over the identity's three expected aliases: the API-key
    /// alias recorded on the directory record, the private-key alias and
    /// the STS client-secret alias. The record is re-read so the check
    /// always uses the alias the directory actually assigned.
    pub async fn verify(&self, identity_id: &str) -> Result<SecretVisibility> {
        let record = self
            .directory
            .get(identity_id)
            .await?
            .ok_or_else(|| SeedError::IdentityNotFound {
                identity_id: identity_id.to_string(),
            })?;

        let mut found = 0u32;
        found += self.check(&record.api_key_alias, "API key").await as u32;
        found += self
            .check(
                &alias::alias_for(identity_id, SecretKind::PrivateKey),
                "private key",
            )
            .await as u32;
        found += self
            .check(
                &alias::alias_for(identity_id, SecretKind::StsClientSecret),
                "STS client secret",
            )
            .await as u32;

        let visibility = SecretVisibility {
            found,
            missing: 3 - found,
        };
        info!(
            "secret visibility for '{}': {}/3 found, {}/3 missing",
            identity_id, visibility.found, visibility.missing
        );
        Ok(visibility)
    }

    /// A secret counts as found only when present and non-empty; a read
    /// failure counts as missing and is absorbed here.
    async fn check(&self, secret_alias: &str, label: &str) -> bool {
        match self.secrets.resolve(secret_alias).await {
            Ok(Some(value)) if !value.is_empty() => {
                debug!("{} found (alias: {})", label, secret_alias);
                true
            }
            Ok(_) => {
                warn!("{} not found in secret store (alias: {})", label, secret_alias);
                false
            }
            Err(e) => {
                warn!(
                    "{} lookup failed (alias: {}): {}",
                    label, secret_alias, e
                );
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
    use crate::store::{InMemoryDirectory, InMemoryDocumentStore, InMemorySecretStore};

    async fn seeded() -> (InMemorySecretStore, InMemoryDirectory) {
        let secrets = InMemorySecretStore::new();
        let directory = InMemoryDirectory::new(secrets.clone(), InMemoryDocumentStore::new());
        let manifest = ManifestBuilder::new(ManifestSettings::default()).tenant_manifest("p1");
        directory.create(&manifest).await.unwrap();
        (secrets, directory)
    }

    #[tokio::test]
    async fn test_all_three_present() {
        let (secrets, directory) = seeded().await;
        let visibility = SecretVerifier::new(&directory, &secrets)
            .verify("p1")
            .await
            .unwrap();
        assert_eq!(visibility.found, 3);
        assert_eq!(visibility.missing, 0);
        assert!(visibility.all_present());
    }

    #[tokio::test]
    async fn test_two_of_three_present() {
        let (secrets, directory) = seeded().await;
        secrets.store("p1-sts-client-secret", "").await.unwrap();

        let visibility = SecretVerifier::new(&directory, &secrets)
            .verify("p1")
            .await
            .unwrap();
        assert_eq!(visibility.found, 2);
        assert_eq!(visibility.missing, 1);
        assert!(!visibility.all_present());
    }

    #[tokio::test]
    async fn test_empty_value_counts_as_missing() {
        let (secrets, directory) = seeded().await;
        secrets.store("p1-alias", "").await.unwrap();
        secrets.store("p1-apikey", "").await.unwrap();

        let visibility = SecretVerifier::new(&directory, &secrets)
            .verify("p1")
            .await
            .unwrap();
        assert_eq!(visibility.found, 1);
        assert_eq!(visibility.missing, 2);
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let secrets = InMemorySecretStore::new();
        let directory = InMemoryDirectory::new(secrets.clone(), InMemoryDocumentStore::new());

        let err = SecretVerifier::new(&directory, &secrets)
            .verify("ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, SeedError::IdentityNotFound { .. }));
    }
}
