//! Identity manifests and their construction from configuration.
//!
//! A manifest is the creation request handed to the identity directory.
//! Manifests are immutable once built and constructed fresh for every
//! bootstrap pass; the builder itself is pure and touches no store.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::alias;
use crate::error::{Result, SeedError};
use crate::settings::ManifestSettings;

/// Role granted to the super identity.
pub const ROLE_ADMIN: &str = "admin";

/// Path segment inserted between the credentials API mount point and the
/// encoded identity id when deriving a credential-service URL.
const CREDENTIAL_PARTICIPANT_PATH: &str = "/v1/participants/";

/// A service endpoint advertised in an identity's DID document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Endpoint id, `<identity id>#<name>`
    pub id: String,
    /// Endpoint type tag
    #[serde(rename = "type")]
    pub endpoint_type: String,
    /// Endpoint URL
    pub url: String,
}

/// Key-generation parameters for an identity's initial key pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyDescriptor {
    /// Signature algorithm, e.g. `EdDSA`
    pub algorithm: String,
    /// Curve, e.g. `Ed25519`
    pub curve: String,
    /// Public key id
    pub key_id: String,
    /// Secret-store alias the private key is materialized under
    pub private_key_alias: String,
}

/// Creation request for one identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityManifest {
    /// Unique, externally supplied identity id
    pub identity_id: String,
    /// Decentralized identifier
    pub did: String,
    /// Whether the identity starts active
    pub active: bool,
    /// Service endpoints carried into the DID document
    pub service_endpoints: Vec<ServiceEndpoint>,
    /// Role names
    pub roles: Vec<String>,
    /// Initial key pair parameters
    pub key: KeyDescriptor,
}

/// Builds manifests from start-up configuration.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    settings: ManifestSettings,
}

impl ManifestBuilder {
    /// Create a builder over immutable manifest settings.
    pub fn new(settings: ManifestSettings) -> Self {
        Self { settings }
    }

    /// One manifest per non-blank, trimmed id in the comma-separated list.
    /// Blank entries are skipped silently.
    pub fn tenant_manifests(&self, identity_ids_csv: &str) -> Vec<IdentityManifest> {
        identity_ids_csv
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| self.tenant_manifest(id))
            .collect()
    }

    /// Manifest for one ordinary tenant identity. The DID is the id itself
    /// (tenant ids are expected to be `did:web:` identifiers).
    pub fn tenant_manifest(&self, identity_id: &str) -> IdentityManifest {
        IdentityManifest {
            identity_id: identity_id.to_string(),
            did: identity_id.to_string(),
            active: true,
            service_endpoints: vec![
                self.credential_service_endpoint(identity_id),
                self.protocol_endpoint(identity_id),
            ],
            roles: Vec::new(),
            key: KeyDescriptor {
                algorithm: self.settings.key_algorithm.clone(),
                curve: self.settings.key_curve.clone(),
                key_id: alias::tenant_key_id(identity_id),
                private_key_alias: alias::alias_for(identity_id, alias::SecretKind::PrivateKey),
            },
        }
    }

    /// Manifest for the privileged super identity: admin role, no service
    /// endpoints, `did:web:<id>` unless an explicit DID is configured.
    pub fn super_manifest(&self, identity_id: &str, did: Option<&str>) -> IdentityManifest {
        IdentityManifest {
            identity_id: identity_id.to_string(),
            did: did
                .map(str::to_string)
                .unwrap_or_else(|| alias::default_did(identity_id)),
            active: true,
            service_endpoints: Vec::new(),
            roles: vec![ROLE_ADMIN.to_string()],
            key: KeyDescriptor {
                algorithm: self.settings.key_algorithm.clone(),
                curve: self.settings.key_curve.clone(),
                key_id: alias::super_key_id(identity_id),
                private_key_alias: alias::alias_for(identity_id, alias::SecretKind::PrivateKey),
            },
        }
    }

    fn credential_service_endpoint(&self, identity_id: &str) -> ServiceEndpoint {
        let url = match &self.settings.credential_service_url {
            Some(explicit) if !explicit.is_empty() => explicit.clone(),
            _ => {
                // The credentials API addresses identities by the
                // base64url-encoded id in the path.
                let encoded = URL_SAFE.encode(identity_id.as_bytes());
                format!(
                    "https://{}{}{}{}",
                    alias::web_host(identity_id),
                    self.settings.credentials_api_path,
                    CREDENTIAL_PARTICIPANT_PATH,
                    encoded
                )
            }
        };
        ServiceEndpoint {
            id: format!("{identity_id}#CredentialService"),
            endpoint_type: "CredentialService".to_string(),
            url,
        }
    }

    fn protocol_endpoint(&self, identity_id: &str) -> ServiceEndpoint {
        let url = match &self.settings.protocol_endpoint_url {
            Some(explicit) if !explicit.is_empty() => explicit.clone(),
            _ => format!(
                "https://{}{}",
                alias::web_host(identity_id),
                self.settings.protocol_api_path
            ),
        };
        ServiceEndpoint {
            id: format!("{identity_id}#ProtocolEndpoint"),
            endpoint_type: "ProtocolEndpoint".to_string(),
            url,
        }
    }
}

/// Validate a manifest before creation is attempted. A failure abandons
/// creation for that identity only; batch processing continues.
pub fn validate_manifest(manifest: &IdentityManifest) -> Result<()> {
    let reject = |reason: &str| {
        Err(SeedError::InvalidManifest {
            identity_id: manifest.identity_id.clone(),
            reason: reason.to_string(),
        })
    };

    if manifest.identity_id.trim().is_empty() {
        return reject("identity id is blank");
    }
    if manifest.did.trim().is_empty() {
        return reject("DID is blank");
    }
    if manifest.key.key_id.trim().is_empty() {
        return reject("key id is blank");
    }
    if manifest.key.private_key_alias.trim().is_empty() {
        return reject("private key alias is blank");
    }
    if manifest.key.algorithm.trim().is_empty() {
        return reject("key algorithm is blank");
    }
    Ok(())
}
