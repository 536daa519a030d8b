//! Content fingerprints of trusted root certificates.
//!
//! The `sha` claim binds a token to one root: the CA recomputes the
//! fingerprint of its own root and rejects tokens minted for another.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::ProvisionerError;

/// Hash bytes using SHA-256, hex encoded.
pub fn fingerprint_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Fingerprint the raw contents of the file at `path`.
pub fn fingerprint_file(path: impl AsRef<Path>) -> Result<String, ProvisionerError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| ProvisionerError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(fingerprint_bytes(&data))
}
