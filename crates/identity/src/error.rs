//! Error types for identity seeding operations.

use thiserror::Error;

/// Result type for seeding operations.
pub type Result<T> = std::result::Result<T, SeedError>;

/// Errors that can occur while provisioning identities and reconciling
/// their secret material.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The directory has no record for the identity
    #[error("Identity not found: {identity_id}")]
    IdentityNotFound { identity_id: String },

    /// A manifest was rejected before creation was attempted
    #[error("Invalid manifest for '{identity_id}': {reason}")]
    InvalidManifest { identity_id: String, reason: String },

    /// Identity directory call failed
    #[error("Directory error: {0}")]
    Directory(String),

    /// Secret store read or write failed
    #[error("Secret store error: {0}")]
    SecretStore(String),

    /// DID document store call failed
    #[error("Document store error: {0}")]
    DocumentStore(String),

    /// No data source registered under the requested name
    #[error("Unknown data source: {0}")]
    UnknownDataSource(String),

    /// Relational store errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The retry budget for an identity's secret-visibility check ran out.
    /// This is the only failure that must abort start-up.
    #[error("Failed to bootstrap identity '{identity_id}' after {attempts} attempts")]
    BootstrapExhausted { identity_id: String, attempts: u32 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
