//! Core domain errors.

use thiserror::Error;

/// Core domain errors for ottkit.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A record is missing its key identifier.
    #[error("Provisioner record has an empty kid")]
    EmptyKid,

    /// Two records share the same non-empty name.
    #[error("Duplicate provisioner name: {0}")]
    DuplicateName(String),

    /// Two records share the same key identifier.
    #[error("Duplicate provisioner kid: {0}")]
    DuplicateKid(String),

    /// Signing algorithm not supported.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}
