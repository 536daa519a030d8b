//! Signing keys behind an algorithm-agnostic capability.

use ed25519_dalek::Signer as _;
use ottkit_core::KeyAlgorithm;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::Zeroizing;

use super::Jwk;
use crate::ProvisionerError;

/// Something that can sign token bytes.
///
/// Implementations must be safe to call from several threads at once.
pub trait TokenSigner: Send + Sync {
    /// Algorithm of the produced signatures.
    fn algorithm(&self) -> KeyAlgorithm;

    /// Public key of this signer.
    fn public_jwk(&self) -> Jwk;

    /// Sign `message`, returning the JWS signature bytes.
    fn try_sign(&self, message: &[u8]) -> Result<Vec<u8>, ProvisionerError>;
}

/// A decrypted provisioner private key.
///
/// Both variants zeroize their secret scalar on drop. There is no `Debug`
/// implementation so key material cannot end up in logs.
pub enum SigningKey {
    Es256(p256::ecdsa::SigningKey),
    EdDsa(ed25519_dalek::SigningKey),
}

impl SigningKey {
    /// Generate a fresh random key.
    pub fn generate(alg: KeyAlgorithm) -> Self {
        let mut rng = rand::rngs::OsRng;
        match alg {
            KeyAlgorithm::Es256 => Self::Es256(p256::ecdsa::SigningKey::random(&mut rng)),
            KeyAlgorithm::EdDsa => Self::EdDsa(ed25519_dalek::SigningKey::generate(&mut rng)),
        }
    }

    /// Load a key from its raw 32-byte secret.
    pub fn from_bytes(alg: KeyAlgorithm, bytes: &[u8]) -> Result<Self, ProvisionerError> {
        match alg {
            KeyAlgorithm::Es256 => p256::ecdsa::SigningKey::from_slice(bytes)
                .map(Self::Es256)
                .map_err(|_| ProvisionerError::DecryptionFailed),
            KeyAlgorithm::EdDsa => {
                let secret: Zeroizing<[u8; 32]> = Zeroizing::new(
                    bytes
                        .try_into()
                        .map_err(|_| ProvisionerError::DecryptionFailed)?,
                );
                Ok(Self::EdDsa(ed25519_dalek::SigningKey::from_bytes(&secret)))
            }
        }
    }

    /// Export the raw secret.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        match self {
            Self::Es256(key) => Zeroizing::new(key.to_bytes().to_vec()),
            Self::EdDsa(key) => Zeroizing::new(key.to_bytes().to_vec()),
        }
    }
}

impl TokenSigner for SigningKey {
    fn algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::Es256(_) => KeyAlgorithm::Es256,
            Self::EdDsa(_) => KeyAlgorithm::EdDsa,
        }
    }

    fn public_jwk(&self) -> Jwk {
        match self {
            Self::Es256(key) => {
                let point = p256::PublicKey::from(key.verifying_key()).to_encoded_point(false);
                // Uncompressed points always carry both coordinates.
                let x = point.x().map(|x| x.as_slice()).unwrap_or_default();
                let y = point.y().map(|y| y.as_slice()).unwrap_or_default();
                Jwk::p256(x, y)
            }
            Self::EdDsa(key) => Jwk::ed25519(key.verifying_key().as_bytes()),
        }
    }

    fn try_sign(&self, message: &[u8]) -> Result<Vec<u8>, ProvisionerError> {
        match self {
            Self::Es256(key) => {
                let signature: p256::ecdsa::Signature =
                    p256::ecdsa::signature::Signer::try_sign(key, message)
                        .map_err(|e| ProvisionerError::SigningUnavailable(e.to_string()))?;
                Ok(signature.to_bytes().to_vec())
            }
            Self::EdDsa(key) => key
                .try_sign(message)
                .map(|signature| signature.to_bytes().to_vec())
                .map_err(|e| ProvisionerError::SigningUnavailable(e.to_string())),
        }
    }
}

/// Maps a key algorithm to the identifier used by JWT verifiers.
pub(crate) fn jwt_algorithm(alg: KeyAlgorithm) -> jsonwebtoken::Algorithm {
    match alg {
        KeyAlgorithm::Es256 => jsonwebtoken::Algorithm::ES256,
        KeyAlgorithm::EdDsa => jsonwebtoken::Algorithm::EdDSA,
    }
}
