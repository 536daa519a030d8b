//! Provisioner errors.

use std::path::PathBuf;

use ottkit_core::CoreError;
use thiserror::Error;

/// Errors returned by the directory and the token issuer.
#[derive(Debug, Error)]
pub enum ProvisionerError {
    /// No provisioner matched the lookup.
    #[error("provisioner not found: {0}")]
    NotFound(String),

    /// A required file could not be read.
    #[error("failed to read '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The password does not unlock the key, or the key material is malformed.
    ///
    /// Deliberately carries no detail about which check failed.
    #[error("failed to decrypt provisioner key")]
    DecryptionFailed,

    /// Caller supplied an unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No usable signing key at sign time.
    #[error("signing key unavailable: {0}")]
    SigningUnavailable(String),

    /// The configuration store is malformed.
    #[error("malformed provisioner store '{}': {message}", path.display())]
    Store { path: PathBuf, message: String },

    /// Writing the configuration store failed.
    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid directory configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ProvisionerError {
    /// Returns true for the not-found class: no matching record, or an
    /// unreadable required file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Unreadable { .. })
    }
}

impl From<CoreError> for ProvisionerError {
    fn from(e: CoreError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}
