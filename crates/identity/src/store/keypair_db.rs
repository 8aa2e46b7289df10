//! Relational key-pair metadata rows.
//!
//! The platform's key management keeps the serialized public key for each
//! identity in a relational table. When an operator overrides a private
//! key, the row must be rewritten to match, inside a scoped transaction
//! resolved from a named data source. Rows only ever hold public
//! material.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{Result, SeedError};

/// Registry of named SQLite data sources.
///
/// Resolving a name opens a fresh connection; the connection is released
/// when it goes out of scope, on every exit path.
#[derive(Debug, Clone, Default)]
pub struct DataSourceRegistry {
    sources: HashMap<String, PathBuf>,
}

impl DataSourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a data source under a name, replacing any previous path.
    pub fn register(&mut self, name: &str, path: impl AsRef<Path>) {
        self.sources
            .insert(name.to_string(), path.as_ref().to_path_buf());
    }

    /// Open a connection to a named data source.
    pub fn resolve(&self, name: &str) -> Result<Connection> {
        let path = self
            .sources
            .get(name)
            .ok_or_else(|| SeedError::UnknownDataSource(name.to_string()))?;
        Ok(Connection::open(path)?)
    }
}

/// Key-pair metadata rows keyed by identity id.
#[derive(Debug, Clone)]
pub struct KeyPairDatabase {
    registry: DataSourceRegistry,
    data_source: String,
}

impl KeyPairDatabase {
    /// Bind to a named data source in the registry. Resolution is lazy;
    /// a bad name surfaces on first use.
    pub fn new(registry: DataSourceRegistry, data_source: impl Into<String>) -> Self {
        Self {
            registry,
            data_source: data_source.into(),
        }
    }

    /// Create the key-pair table if it does not exist.
    pub fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS keypair_resource (
                identity_id TEXT PRIMARY KEY,
                key_id TEXT NOT NULL,
                serialized_public_key TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Ensure a row exists for an identity, without touching any key
    /// material already stored there.
    pub fn ensure_row(&self, identity_id: &str, key_id: &str) -> Result<()> {
        let conn = self.registry.resolve(&self.data_source)?;
        conn.execute(
            "INSERT INTO keypair_resource (identity_id, key_id, serialized_public_key, updated_at)
             VALUES (?1, ?2, '', ?3)
             ON CONFLICT(identity_id) DO NOTHING",
            params![identity_id, key_id, current_timestamp() as i64],
        )?;
        Ok(())
    }

    /// Rewrite the serialized public key for an identity inside a scoped
    /// transaction. Returns the number of rows affected; zero means no
    /// row existed for the identity.
    pub fn update_public_key(&self, identity_id: &str, public_jwk_json: &str) -> Result<usize> {
        let mut conn = self.registry.resolve(&self.data_source)?;
        let tx = conn.transaction()?;
        let updated = tx.execute(
            "UPDATE keypair_resource
             SET serialized_public_key = ?1, updated_at = ?2
             WHERE identity_id = ?3",
            params![public_jwk_json, current_timestamp() as i64, identity_id],
        )?;
        tx.commit()?;
        debug!(
            "updated {} key-pair row(s) for identity '{}'",
            updated, identity_id
        );
        Ok(updated)
    }

    /// The serialized public key stored for an identity, if any.
    pub fn public_key_for(&self, identity_id: &str) -> Result<Option<String>> {
        let conn = self.registry.resolve(&self.data_source)?;
        let row = conn
            .query_row(
                "SELECT serialized_public_key FROM keypair_resource WHERE identity_id = ?1",
                params![identity_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row)
    }
}

/// Current timestamp in milliseconds.
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
