//! JSON Web Key handling for override propagation.
//!
//! Only the members the propagation path needs are modeled as fields;
//! anything else a caller supplies is preserved through `extra` so that
//! re-serialized keys round-trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// A JSON Web Key, public or private.
///
/// `kty`, `crv` and `x` are required; a key missing any of them fails to
/// parse. The private scalar `d` is optional and must be stripped with
/// [`Jwk::public_only`] before the key is written anywhere that only
/// holds public material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Jwk {
    /// Key type, e.g. `OKP`
    pub kty: String,
    /// Curve name, e.g. `Ed25519`
    pub crv: String,
    /// Public key coordinate (base64url)
    pub x: String,
    /// Key id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Private scalar (base64url); never persisted to public stores
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// Members this module does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Jwk {
    /// Parse a JWK from its JSON text. Missing required members (`kty`,
    /// `crv`, `x`) surface as a parse error.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// A copy of this key with the private `d` member stripped.
    pub fn public_only(&self) -> Self {
        Self {
            d: None,
            ..self.clone()
        }
    }

    /// Whether this key carries private material.
    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Serialize back to JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Check the expected shape of an operator-supplied override value:
/// `base64(<identity id>).<random suffix>`. The check is advisory; what
/// happens to a malformed value is a policy decision made by the caller.
pub fn override_has_expected_format(value: &str) -> bool {
    value.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_JWK: &str = r#"{
        "kty": "OKP",
        "crv": "Ed25519",
        "x": "abc123",
        "d": "secret456",
        "kid": "p1#key"
    }"#;

    #[test]
    fn test_parse_private_jwk() {
        let jwk = Jwk::parse(PRIVATE_JWK).unwrap();
        assert_eq!(jwk.kty, "OKP");
        assert_eq!(jwk.crv, "Ed25519");
        assert_eq!(jwk.x, "abc123");
        assert_eq!(jwk.d.as_deref(), Some("secret456"));
        assert_eq!(jwk.kid.as_deref(), Some("p1#key"));
    }

    #[test]
    fn test_parse_rejects_missing_required_member() {
        let missing_x = r#"{"kty": "OKP", "crv": "Ed25519"}"#;
        assert!(Jwk::parse(missing_x).is_err());
    }

    #[test]
    fn test_parse_rejects_non_jwk_text() {
        assert!(Jwk::parse("YWJj.xyz").is_err());
    }

    #[test]
    fn test_public_only_strips_private_scalar() {
        let jwk = Jwk::parse(PRIVATE_JWK).unwrap();
        let public = jwk.public_only();
        assert!(public.d.is_none());
        assert_eq!(public.x, jwk.x);

        let json = public.to_json().unwrap();
        assert!(!json.contains("\"d\""));
        assert!(json.contains("\"x\""));
    }

    #[test]
    fn test_unknown_members_round_trip() {
        let raw = r#"{"kty":"OKP","crv":"Ed25519","x":"abc","use":"sig"}"#;
        let jwk = Jwk::parse(raw).unwrap();
        assert_eq!(jwk.extra.get("use"), Some(&Value::from("sig")));
        assert!(jwk.to_json().unwrap().contains("\"use\""));
    }

    #[test]
    fn test_override_format_check() {
        assert!(override_has_expected_format("YWJj.xyz"));
        assert!(!override_has_expected_format("no-separator"));
    }
}
