//! Password sealing of private keys at rest.
//!
//! A key-encryption key is derived from the password with Argon2id and the
//! private key bytes are encrypted with ChaCha20-Poly1305. The record's kid
//! is bound as associated data, so a sealed key moved under another kid
//! fails to open.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use ottkit_core::{KdfParams, KeyId, SealedKey};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::ProvisionerError;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

fn derive_kek(
    password: &[u8],
    salt: &[u8],
    kdf: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>, argon2::Error> {
    let params = Params::new(kdf.m_cost, kdf.t_cost, kdf.p_cost, Some(KEY_LEN))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut kek = Zeroizing::new([0u8; KEY_LEN]);
    argon.hash_password_into(password, salt, &mut *kek)?;
    Ok(kek)
}

/// Seal `secret` under `password`, binding it to `kid`.
pub fn seal_key(
    secret: &[u8],
    kid: &KeyId,
    password: &[u8],
    kdf: KdfParams,
) -> Result<SealedKey, ProvisionerError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    let mut rng = rand::thread_rng();
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut nonce);

    let kek = derive_kek(password, &salt, &kdf)
        .map_err(|e| ProvisionerError::Config(format!("invalid KDF parameters: {}", e)))?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&*kek));
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: secret,
                aad: kid.as_str().as_bytes(),
            },
        )
        .map_err(|_| ProvisionerError::InvalidArgument("failed to seal key".to_string()))?;

    Ok(SealedKey {
        kdf,
        salt: hex::encode(salt),
        nonce: hex::encode(nonce),
        ciphertext: hex::encode(ciphertext),
    })
}

/// Open a sealed key.
///
/// Every failure (bad encoding, bad parameters, wrong password, wrong kid)
/// maps to [`ProvisionerError::DecryptionFailed`].
pub fn unseal_key(
    sealed: &SealedKey,
    kid: &KeyId,
    password: &[u8],
) -> Result<Zeroizing<Vec<u8>>, ProvisionerError> {
    let salt = hex::decode(&sealed.salt).map_err(|_| ProvisionerError::DecryptionFailed)?;
    let nonce = hex::decode(&sealed.nonce).map_err(|_| ProvisionerError::DecryptionFailed)?;
    let ciphertext =
        hex::decode(&sealed.ciphertext).map_err(|_| ProvisionerError::DecryptionFailed)?;
    if nonce.len() != NONCE_LEN {
        return Err(ProvisionerError::DecryptionFailed);
    }

    let kek =
        derive_kek(password, &salt, &sealed.kdf).map_err(|_| ProvisionerError::DecryptionFailed)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&*kek));
    cipher
        .decrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &ciphertext,
                aad: kid.as_str().as_bytes(),
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| ProvisionerError::DecryptionFailed)
}

/// Run one key derivation and discard the result.
///
/// Used when a lookup misses so the caller pays the same KDF cost as for a
/// wrong password.
pub fn burn_kdf(password: &[u8], kdf: &KdfParams) {
    let salt = [0u8; SALT_LEN];
    let _ = derive_kek(password, &salt, kdf);
}
