//! Collaborator interfaces for the stores the seeder drives.
//!
//! The seeding core consumes four independently-owned backends: the
//! identity directory (the single source of truth for identity
//! uniqueness), an eventually-consistent secret store, a DID document
//! store, and a relational key-metadata table. None of them are
//! implemented here beyond reference backends; production deployments
//! plug their own clients in behind these traits.
//!
//! # Modules
//!
//! - [`memory`]: in-memory directory, secret store and document store.
//! - [`keypair_db`]: SQLite-backed key-pair metadata rows.

pub mod keypair_db;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::DidDocument;
use crate::error::Result;
use crate::manifest::IdentityManifest;

pub use keypair_db::{DataSourceRegistry, KeyPairDatabase};
pub use memory::{InMemoryDirectory, InMemoryDocumentStore, InMemorySecretStore};

/// Lifecycle state of a directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Created but not yet activated
    Created,
    /// Active and serving
    Activated,
    /// Administratively disabled
    Deactivated,
}

/// The directory's view of a provisioned identity. The seeder reads and
/// creates records; it never mutates fields directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityRecord {
    /// Unique identity id
    pub identity_id: String,
    /// Decentralized identifier
    pub did: String,
    /// Lifecycle state
    pub state: LifecycleState,
    /// Secret-store alias of the identity's API key
    pub api_key_alias: String,
}

/// Secret material generated by the directory when an identity is created.
#[derive(Debug, Clone)]
pub struct CreatedIdentity {
    /// Generated API authentication key
    pub api_key: String,
    /// OAuth client id for the secure token service
    pub client_id: String,
    /// OAuth client secret for the secure token service
    pub client_secret: String,
}

/// Outcome of a create call.
#[derive(Debug)]
pub enum CreateOutcome {
    /// The identity was created by this call
    Created(CreatedIdentity),
    /// Another creator won the race; equivalent to "already exists"
    Conflict,
}

/// Identity directory: create/read identity records by id.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Look up an identity record. `Ok(None)` means not found, which is
    /// an expected state driving the creation path, never an error.
    async fn get(&self, identity_id: &str) -> Result<Option<IdentityRecord>>;

    /// Create an identity from a manifest. Uniqueness is enforced by the
    /// directory; racing creators converge on [`CreateOutcome::Conflict`].
    async fn create(&self, manifest: &IdentityManifest) -> Result<CreateOutcome>;
}

/// Key-value store for named secrets. Writes from the directory become
/// visible here eventually, not immediately.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Resolve a secret by alias; `Ok(None)` when absent.
    async fn resolve(&self, alias: &str) -> Result<Option<String>>;

    /// Store a secret, overwriting any existing value at the alias.
    async fn store(&self, alias: &str, value: &str) -> Result<()>;
}

/// Store for per-identity DID documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The identity's document, if one has been materialized.
    async fn query(&self, identity_id: &str) -> Result<Option<DidDocument>>;

    /// Persist an updated document.
    async fn update(&self, document: &DidDocument) -> Result<()>;

    /// Publish the document under its DID.
    async fn publish(&self, did: &str) -> Result<()>;
}
