//! Public JSON Web Keys and their thumbprints.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::DecodingKey;
use ottkit_core::{KeyAlgorithm, KeyId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ProvisionerError;

/// Public half of a provisioner key, in JWK form.
///
/// This is what a CA is configured with to verify issued tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type: `EC` or `OKP`.
    pub kty: String,

    /// Curve name: `P-256` or `Ed25519`.
    pub crv: String,

    /// X coordinate (EC) or public key bytes (OKP), base64url.
    pub x: String,

    /// Y coordinate, EC keys only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Signing algorithm.
    pub alg: KeyAlgorithm,

    /// Key identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Jwk {
    /// JWK for a P-256 public key given its affine coordinates.
    pub fn p256(x: &[u8], y: &[u8]) -> Self {
        Self {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x: URL_SAFE_NO_PAD.encode(x),
            y: Some(URL_SAFE_NO_PAD.encode(y)),
            alg: KeyAlgorithm::Es256,
            kid: None,
        }
    }

    /// JWK for an Ed25519 public key.
    pub fn ed25519(public_key: &[u8]) -> Self {
        Self {
            kty: "OKP".to_string(),
            crv: "Ed25519".to_string(),
            x: URL_SAFE_NO_PAD.encode(public_key),
            y: None,
            alg: KeyAlgorithm::EdDsa,
            kid: None,
        }
    }

    /// RFC 7638 thumbprint: base64url SHA-256 of the required members in
    /// lexicographic order.
    pub fn thumbprint(&self) -> KeyId {
        let canonical = match &self.y {
            Some(y) => format!(
                r#"{{"crv":"{}","kty":"{}","x":"{}","y":"{}"}}"#,
                self.crv, self.kty, self.x, y
            ),
            None => format!(
                r#"{{"crv":"{}","kty":"{}","x":"{}"}}"#,
                self.crv, self.kty, self.x
            ),
        };
        KeyId::new(URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes())))
    }

    /// Set `kid` to the thumbprint.
    pub fn with_thumbprint_kid(mut self) -> Self {
        self.kid = Some(self.thumbprint().into_inner());
        self
    }

    /// Verification key for standard JWT verifiers.
    pub fn decoding_key(&self) -> Result<DecodingKey, ProvisionerError> {
        let key = match (self.kty.as_str(), &self.y) {
            ("EC", Some(y)) => DecodingKey::from_ec_components(&self.x, y),
            ("OKP", None) => DecodingKey::from_ed_components(&self.x),
            _ => {
                return Err(ProvisionerError::InvalidArgument(format!(
                    "unsupported JWK: kty={} crv={}",
                    self.kty, self.crv
                )))
            }
        };
        key.map_err(|e| ProvisionerError::InvalidArgument(e.to_string()))
    }
}
