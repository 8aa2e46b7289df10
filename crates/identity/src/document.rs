//! DID documents and verification-method maintenance.

use serde::{Deserialize, Serialize};

use crate::jwk::Jwk;
use crate::manifest::ServiceEndpoint;

/// Verification-method type tag for JWK-carrying methods.
pub const METHOD_TYPE_JSON_WEB_KEY: &str = "JsonWebKey2020";

/// An entry in a DID document binding a key id to public key material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationMethod {
    /// Method id, `<identity id>#key`
    pub id: String,
    /// Method type tag
    #[serde(rename = "type")]
    pub method_type: String,
    /// DID of the controlling identity
    pub controller: String,
    /// Public key material; must never carry the private `d` member
    pub public_key_jwk: Jwk,
}

/// One identity's public-key document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DidDocument {
    /// The DID this document describes
    pub id: String,
    /// Owning identity id
    pub identity_id: String,
    /// Key bindings
    pub verification_method: Vec<VerificationMethod>,
    /// Ids of verification methods usable for authentication
    pub authentication: Vec<String>,
    /// Advertised service endpoints
    pub service: Vec<ServiceEndpoint>,
}

impl DidDocument {
    /// An empty document for an identity.
    pub fn new(identity_id: impl Into<String>, did: impl Into<String>) -> Self {
        Self {
            id: did.into(),
            identity_id: identity_id.into(),
            verification_method: Vec::new(),
            authentication: Vec::new(),
            service: Vec::new(),
        }
    }

    /// Replace any verification method carrying the new method's id, then
    /// reference it from the authentication list if it is not already
    /// there. The document never holds two methods with the same id and
    /// the authentication list never holds duplicate references.
    pub fn replace_verification_method(&mut self, method: VerificationMethod) {
        let method_id = method.id.clone();
        self.verification_method.retain(|m| m.id != method_id);
        self.verification_method.push(method);
        if !self.authentication.contains(&method_id) {
            self.authentication.push(method_id);
        }
    }

    /// Look up a verification method by id.
    pub fn verification_method(&self, id: &str) -> Option<&VerificationMethod> {
        self.verification_method.iter().find(|m| m.id == id)
    }
}
