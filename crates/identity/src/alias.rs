//! Deterministic derivation of secret aliases and key identifiers.
//!
//! The directory materializes secrets under these exact names, the
//! visibility verifier polls them, and the override propagator overwrites
//! them. Changing a format here is a breaking change across all three
//! stores, so every derivation lives in this one module.

/// Kinds of secret an identity owns in the secret store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKind {
    /// API authentication key
    ApiKey,
    /// Private key in JWK form
    PrivateKey,
    /// OAuth client secret for the secure token service
    StsClientSecret,
}

/// Derive the canonical secret-store alias for an identity and secret kind.
pub fn alias_for(identity_id: &str, kind: SecretKind) -> String {
    match kind {
        SecretKind::ApiKey => format!("{identity_id}-apikey"),
        SecretKind::PrivateKey => format!("{identity_id}-alias"),
        SecretKind::StsClientSecret => format!("{identity_id}-sts-client-secret"),
    }
}

/// Verification-method id inside an identity's DID document.
pub fn verification_method_id(identity_id: &str) -> String {
    format!("{identity_id}#key")
}

/// Key id recorded on a tenant manifest. Matches the verification-method
/// id so the published document and the key metadata row agree.
pub fn tenant_key_id(identity_id: &str) -> String {
    format!("{identity_id}#key")
}

/// Key id recorded on the super-identity manifest.
pub fn super_key_id(identity_id: &str) -> String {
    format!("{identity_id}-key")
}

/// Fallback DID when none is configured explicitly.
pub fn default_did(identity_id: &str) -> String {
    format!("did:web:{identity_id}")
}

/// Host part of a `did:web:` identifier; ids without the prefix pass
/// through unchanged.
pub fn web_host(identity_id: &str) -> &str {
    identity_id.strip_prefix("did:web:").unwrap_or(identity_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_for_each_kind() {
        assert_eq!(alias_for("p1", SecretKind::ApiKey), "p1-apikey");
        assert_eq!(alias_for("p1", SecretKind::PrivateKey), "p1-alias");
        assert_eq!(
            alias_for("p1", SecretKind::StsClientSecret),
            "p1-sts-client-secret"
        );
    }

    #[test]
    fn test_key_ids_differ_between_tenant_and_super() {
        assert_eq!(tenant_key_id("p1"), "p1#key");
        assert_eq!(super_key_id("super-user"), "super-user-key");
        assert_eq!(verification_method_id("p1"), tenant_key_id("p1"));
    }

    #[test]
    fn test_default_did() {
        assert_eq!(default_did("super-user"), "did:web:super-user");
    }

    #[test]
    fn test_web_host_strips_prefix() {
        assert_eq!(web_host("did:web:example.com"), "example.com");
        assert_eq!(web_host("plain-id"), "plain-id");
    }
}
