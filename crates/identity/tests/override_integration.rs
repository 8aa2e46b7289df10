//! Override propagation across the three backing stores.

use async_trait::async_trait;
use seeder_identity::document::DidDocument;
use seeder_identity::{ManifestBuilder, ManifestSettings};
use seeder_identity::store::{
    DataSourceRegistry, DocumentStore, IdentityDirectory, InMemoryDirectory, InMemoryDocumentStore,
    InMemorySecretStore, KeyPairDatabase, SecretStore,
};
use seeder_identity::{KeyOverridePropagator, OverridePolicy, Result, StepOutcome};

const OVERRIDE_JWK: &str =
    r#"{"kty":"OKP","crv":"Ed25519","x":"override-x","d":"override-d","kid":"p1#key"}"#;

struct Fixture {
    _dir: tempfile::TempDir,
    secrets: InMemorySecretStore,
    documents: InMemoryDocumentStore,
    directory: InMemoryDirectory,
    keypairs: KeyPairDatabase,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keypairs.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    KeyPairDatabase::init_schema(&conn).unwrap();
    let mut registry = DataSourceRegistry::new();
    registry.register("default", &path);
    let keypairs = KeyPairDatabase::new(registry, "default");

    let secrets = InMemorySecretStore::new();
    let documents = InMemoryDocumentStore::new();
    let directory = InMemoryDirectory::new(secrets.clone(), documents.clone());
    let manifest = ManifestBuilder::new(ManifestSettings::default()).tenant_manifest("p1");
    directory.create(&manifest).await.unwrap();
    keypairs.ensure_row("p1", "p1#key").unwrap();

    Fixture {
        _dir: dir,
        secrets,
        documents,
        directory,
        keypairs,
    }
}

/// Document store whose publish always fails.
#[derive(Clone)]
struct FailingPublishStore {
    inner: InMemoryDocumentStore,
}

#[async_trait]
impl DocumentStore for FailingPublishStore {
    async fn query(&self, identity_id: &str) -> Result<Option<DidDocument>> {
        self.inner.query(identity_id).await
    }

    async fn update(&self, document: &DidDocument) -> Result<()> {
        self.inner.update(document).await
    }

    async fn publish(&self, _did: &str) -> Result<()> {
        Err(seeder_identity::SeedError::DocumentStore(
            "publish endpoint unavailable".to_string(),
        ))
    }
}

#[tokio::test]
async fn test_override_round_trip_into_secret_store() {
    let f = fixture().await;
    let propagator = KeyOverridePropagator::new(
        &f.directory,
        &f.secrets,
        &f.documents,
        &f.keypairs,
        OverridePolicy::Warn,
    );

    let report = propagator.propagate("p1", "YWJj.xyz").await;

    assert_eq!(report.format_check, StepOutcome::Completed);
    assert_eq!(report.secret_write, StepOutcome::Completed);
    assert_eq!(
        f.secrets.resolve("p1-apikey").await.unwrap().as_deref(),
        Some("YWJj.xyz")
    );
    // Not a JWK, so nothing reached the document or the database.
    assert!(matches!(report.jwk_parse, StepOutcome::Failed(_)));
    assert_eq!(report.document_update, StepOutcome::Skipped);
    assert_eq!(report.keypair_row, StepOutcome::Skipped);
}

#[tokio::test]
async fn test_malformed_override_is_stored_under_warn_policy() {
    let f = fixture().await;
    let propagator = KeyOverridePropagator::new(
        &f.directory,
        &f.secrets,
        &f.documents,
        &f.keypairs,
        OverridePolicy::Warn,
    );

    // A JWK has no `.` separator, so the format check flags it.
    let report = propagator.propagate("p1", OVERRIDE_JWK).await;

    assert_eq!(
        report.format_check,
        StepOutcome::Warned("invalid format".to_string())
    );
    assert_eq!(
        f.secrets.resolve("p1-apikey").await.unwrap().as_deref(),
        Some(OVERRIDE_JWK)
    );
    assert!(report.fully_applied());
}

#[tokio::test]
async fn test_reject_policy_skips_storage_and_propagation() {
    let f = fixture().await;
    let generated = f.secrets.resolve("p1-apikey").await.unwrap();
    let propagator = KeyOverridePropagator::new(
        &f.directory,
        &f.secrets,
        &f.documents,
        &f.keypairs,
        OverridePolicy::Reject,
    );

    let report = propagator.propagate("p1", OVERRIDE_JWK).await;

    assert_eq!(
        report.format_check,
        StepOutcome::Failed("invalid format".to_string())
    );
    assert_eq!(report.secret_write, StepOutcome::Skipped);
    assert_eq!(report.document_update, StepOutcome::Skipped);
    assert_eq!(report.keypair_row, StepOutcome::Skipped);
    // The generated key is untouched.
    assert_eq!(f.secrets.resolve("p1-apikey").await.unwrap(), generated);
}

#[tokio::test]
async fn test_document_keeps_exactly_one_method_and_reference() {
    let f = fixture().await;
    // The document already carries a generated method and authentication
    // entry for p1#key from creation.
    let before = f.documents.query("p1").await.unwrap().unwrap();
    assert!(before.verification_method("p1#key").is_some());
    assert!(before.authentication.contains(&"p1#key".to_string()));

    let propagator = KeyOverridePropagator::new(
        &f.directory,
        &f.secrets,
        &f.documents,
        &f.keypairs,
        OverridePolicy::Warn,
    );
    let report = propagator.propagate("p1", OVERRIDE_JWK).await;
    assert_eq!(report.document_update, StepOutcome::Completed);
    assert_eq!(report.document_publish, StepOutcome::Completed);

    let after = f.documents.query("p1").await.unwrap().unwrap();
    let methods: Vec<_> = after
        .verification_method
        .iter()
        .filter(|m| m.id == "p1#key")
        .collect();
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0].public_key_jwk.x, "override-x");
    assert!(methods[0].public_key_jwk.d.is_none());
    assert_eq!(
        after.authentication.iter().filter(|a| *a == "p1#key").count(),
        1
    );
    assert!(f.documents.is_published(&after.id));
}

#[tokio::test]
async fn test_missing_document_stops_document_side_only() {
    let f = fixture().await;
    let empty_documents = InMemoryDocumentStore::new();
    let propagator = KeyOverridePropagator::new(
        &f.directory,
        &f.secrets,
        &empty_documents,
        &f.keypairs,
        OverridePolicy::Warn,
    );

    let report = propagator.propagate("p1", OVERRIDE_JWK).await;

    assert_eq!(report.secret_write, StepOutcome::Completed);
    assert!(matches!(report.document_update, StepOutcome::Failed(_)));
    assert_eq!(report.document_publish, StepOutcome::Skipped);
    // The relational step still ran.
    assert_eq!(report.keypair_row, StepOutcome::Completed);
}

#[tokio::test]
async fn test_publish_failure_does_not_roll_back_the_update() {
    let f = fixture().await;
    let failing = FailingPublishStore {
        inner: f.documents.clone(),
    };
    let propagator = KeyOverridePropagator::new(
        &f.directory,
        &f.secrets,
        &failing,
        &f.keypairs,
        OverridePolicy::Warn,
    );

    let report = propagator.propagate("p1", OVERRIDE_JWK).await;

    assert_eq!(report.document_update, StepOutcome::Completed);
    assert!(matches!(report.document_publish, StepOutcome::Failed(_)));

    let stored = f.documents.query("p1").await.unwrap().unwrap();
    assert_eq!(
        stored.verification_method("p1#key").unwrap().public_key_jwk.x,
        "override-x"
    );
}

#[tokio::test]
async fn test_database_failure_is_fully_isolated() {
    let f = fixture().await;
    let broken = KeyPairDatabase::new(DataSourceRegistry::new(), "unregistered");
    let propagator = KeyOverridePropagator::new(
        &f.directory,
        &f.secrets,
        &f.documents,
        &broken,
        OverridePolicy::Warn,
    );

    let report = propagator.propagate("p1", OVERRIDE_JWK).await;

    // The earlier steps all took effect despite the database failure.
    assert_eq!(report.secret_write, StepOutcome::Completed);
    assert_eq!(report.document_update, StepOutcome::Completed);
    assert_eq!(report.document_publish, StepOutcome::Completed);
    assert!(matches!(report.keypair_row, StepOutcome::Failed(_)));
    assert_eq!(
        f.secrets.resolve("p1-apikey").await.unwrap().as_deref(),
        Some(OVERRIDE_JWK)
    );
}

#[tokio::test]
async fn test_keypair_row_never_stores_private_material() {
    let f = fixture().await;
    let propagator = KeyOverridePropagator::new(
        &f.directory,
        &f.secrets,
        &f.documents,
        &f.keypairs,
        OverridePolicy::Warn,
    );

    let report = propagator.propagate("p1", OVERRIDE_JWK).await;
    assert_eq!(report.keypair_row, StepOutcome::Completed);

    let stored = f.keypairs.public_key_for("p1").unwrap().unwrap();
    assert!(stored.contains("\"x\":\"override-x\""));
    assert!(!stored.contains("\"d\""));
}

#[tokio::test]
async fn test_missing_row_is_a_warning_not_a_failure() {
    let f = fixture().await;
    let propagator = KeyOverridePropagator::new(
        &f.directory,
        &f.secrets,
        &f.documents,
        &f.keypairs,
        OverridePolicy::Warn,
    );

    let report = propagator.propagate("p1", OVERRIDE_JWK).await;
    assert_eq!(report.keypair_row, StepOutcome::Completed);

    // A second identity with no row: the step warns but still succeeds.
    let manifest = ManifestBuilder::new(ManifestSettings::default()).tenant_manifest("p2");
    f.directory.create(&manifest).await.unwrap();
    let report = propagator.propagate("p2", OVERRIDE_JWK).await;
    assert_eq!(
        report.keypair_row,
        StepOutcome::Warned("no rows matched".to_string())
    );
}
