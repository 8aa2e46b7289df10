use anyhow::Context;
use rusqlite::Connection;
use tracing::{info, warn};

use seeder_identity::store::{
    DataSourceRegistry, InMemoryDirectory, InMemoryDocumentStore, InMemorySecretStore,
    KeyPairDatabase,
};
use seeder_identity::{shutdown, ManifestBuilder, Seeder};

mod config;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    info!(
        "seeder starting: super identity '{}', max retries {}, retry delay {}ms",
        config.settings.super_identity_id,
        config.settings.retry.max_retries,
        config.settings.retry.retry_delay.as_millis()
    );

    let conn = Connection::open(&config.keypair_db_path)
        .with_context(|| format!("opening {}", config.keypair_db_path.display()))?;
    KeyPairDatabase::init_schema(&conn)?;
    drop(conn);

    let mut registry = DataSourceRegistry::new();
    registry.register(&config.settings.data_source, &config.keypair_db_path);
    let keypairs = KeyPairDatabase::new(registry, config.settings.data_source.clone());

    let secrets = InMemorySecretStore::new();
    let documents = InMemoryDocumentStore::new();
    let directory = InMemoryDirectory::new(secrets.clone(), documents.clone());

    // The platform's key management owns these rows; make sure they exist
    // so an override pass has something to rewrite.
    let builder = ManifestBuilder::new(config.settings.manifest.clone());
    let super_manifest = builder.super_manifest(
        &config.settings.super_identity_id,
        config.settings.super_identity_did.as_deref(),
    );
    keypairs.ensure_row(&super_manifest.identity_id, &super_manifest.key.key_id)?;
    for manifest in builder.tenant_manifests(&config.settings.identity_ids) {
        keypairs.ensure_row(&manifest.identity_id, &manifest.key.key_id)?;
    }

    let (handle, mut signal) = shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("shutdown signal received");
            handle.trigger();
        }
    });

    let seeder = Seeder::new(
        &directory,
        &secrets,
        &documents,
        &keypairs,
        config.settings.clone(),
    );
    let summary = seeder
        .run(&mut signal)
        .await
        .context("identity seeding failed")?;

    if summary.interrupted {
        warn!("seeding interrupted before completion");
    }
    info!(
        "seeding done: {} bootstrapped, {} skipped, {} override report(s)",
        summary.bootstrapped.len(),
        summary.skipped.len(),
        summary.override_reports.len()
    );
    Ok(())
}
