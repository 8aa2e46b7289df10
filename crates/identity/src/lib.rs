//! Identity seeding and secret reconciliation for a multi-tenant
//! identity hub.
//!
//! This crate provisions a privileged super identity and ordinary tenant
//! identities into an identity directory, polls the eventually-consistent
//! secret store until the expected secret material appears, and optionally
//! propagates an operator-supplied private-key override across the secret
//! store, the DID document store and the relational key-pair table.
//!
//! # Core Concepts
//!
//! - **Manifest**: the immutable creation request for one identity
//! - **Bootstrap**: the bounded retry loop from "maybe absent" to
//!   "created with all secrets visible"
//! - **Visibility verification**: one pass over the three expected
//!   secret aliases, no internal retries
//! - **Override propagation**: a multi-store saga with per-step outcomes
//!   and no cross-store rollback
//!
//! The four backing stores are consumed behind traits in [`store`];
//! in-memory reference backends and a SQLite key-pair table are bundled
//! for tests, development and the seeder binary.

pub mod alias;
pub mod bootstrap;
pub mod document;
pub mod error;
pub mod jwk;
pub mod key_override;
pub mod manifest;
pub mod seeder;
pub mod settings;
pub mod shutdown;
pub mod store;
pub mod verify;

pub use bootstrap::{BootstrapOrchestrator, BootstrapOutcome};
pub use document::{DidDocument, VerificationMethod};
pub use error::{Result, SeedError};
pub use jwk::Jwk;
pub use key_override::{KeyOverridePropagator, PropagationReport, StepOutcome};
pub use manifest::{IdentityManifest, KeyDescriptor, ManifestBuilder, ServiceEndpoint};
pub use seeder::{SeedSummary, Seeder};
pub use settings::{ManifestSettings, OverridePolicy, RetrySettings, SeedSettings};
pub use shutdown::{ShutdownHandle, ShutdownSignal};
pub use store::{
    CreateOutcome, CreatedIdentity, DataSourceRegistry, DocumentStore, IdentityDirectory,
    IdentityRecord, KeyPairDatabase, SecretStore,
};
pub use verify::{SecretVerifier, SecretVisibility};
