//! Immutable configuration value objects.
//!
//! All knobs are read once at start-up and passed into constructors
//! explicitly; nothing in this crate reads ambient configuration.

use std::str::FromStr;
use std::time::Duration;

use crate::error::SeedError;

/// Default super-identity id.
pub const DEFAULT_SUPER_IDENTITY_ID: &str = "super-user";

/// Default signature algorithm for generated key pairs.
pub const DEFAULT_KEY_ALGORITHM: &str = "EdDSA";

/// Default curve for generated key pairs.
pub const DEFAULT_KEY_CURVE: &str = "Ed25519";

/// Default bound on bootstrap attempts per identity.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default delay between bootstrap attempts.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;

/// Default named data source for key-pair metadata rows.
pub const DEFAULT_DATA_SOURCE: &str = "default";

/// Retry bounds for the bootstrap loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Maximum bootstrap attempts per identity (>= 1)
    pub max_retries: u32,
    /// Delay between attempts
    pub retry_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// What to do with an override value that fails the format check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverridePolicy {
    /// Store the value anyway and log a warning
    #[default]
    Warn,
    /// Skip the store and the whole propagation for that identity
    Reject,
}

impl FromStr for OverridePolicy {
    type Err = SeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "reject" => Ok(Self::Reject),
            other => Err(SeedError::Config(format!(
                "unknown override policy '{other}', expected 'warn' or 'reject'"
            ))),
        }
    }
}

/// Inputs for manifest construction and endpoint derivation.
#[derive(Debug, Clone)]
pub struct ManifestSettings {
    /// Signature algorithm recorded in key descriptors
    pub key_algorithm: String,
    /// Curve recorded in key descriptors
    pub key_curve: String,
    /// Explicit credential-service URL; derived from the id when absent
    pub credential_service_url: Option<String>,
    /// Explicit protocol endpoint URL; derived from the id when absent
    pub protocol_endpoint_url: Option<String>,
    /// Path under which the credentials API is mounted
    pub credentials_api_path: String,
    /// Path under which the protocol API is mounted
    pub protocol_api_path: String,
}

impl Default for ManifestSettings {
    fn default() -> Self {
        Self {
            key_algorithm: DEFAULT_KEY_ALGORITHM.to_string(),
            key_curve: DEFAULT_KEY_CURVE.to_string(),
            credential_service_url: None,
            protocol_endpoint_url: None,
            credentials_api_path: "/api/credentials".to_string(),
            protocol_api_path: "/api/dsp".to_string(),
        }
    }
}

/// Everything the seeding pass needs, read once at start-up.
#[derive(Debug, Clone)]
pub struct SeedSettings {
    /// Super-identity id
    pub super_identity_id: String,
    /// Explicit super-identity DID; defaults to `did:web:<id>` when absent
    pub super_identity_did: Option<String>,
    /// Comma-separated tenant identity ids; blanks are skipped
    pub identity_ids: String,
    /// Manifest construction inputs
    pub manifest: ManifestSettings,
    /// Bootstrap retry bounds
    pub retry: RetrySettings,
    /// Operator-supplied private-key override (JWK text)
    pub override_private_key: Option<String>,
    /// Policy for override values that fail the format check
    pub override_policy: OverridePolicy,
    /// Named data source for key-pair metadata rows
    pub data_source: String,
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            super_identity_id: DEFAULT_SUPER_IDENTITY_ID.to_string(),
            super_identity_did: None,
            identity_ids: String::new(),
            manifest: ManifestSettings::default(),
            retry: RetrySettings::default(),
            override_private_key: None,
            override_policy: OverridePolicy::default(),
            data_source: DEFAULT_DATA_SOURCE.to_string(),
        }
    }
}
