//! ottkit Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Signing or encryption primitives
//! - The filesystem
//! - Logging
//!
//! All types here describe configured provisioners and the identifiers
//! attached to the tokens they issue. The only source of entropy is the
//! system CSPRNG behind [`TokenId::generate`].

pub mod algorithm;
pub mod error;
pub mod ids;
pub mod record;

// Re-export commonly used types
pub use algorithm::KeyAlgorithm;
pub use error::CoreError;
pub use ids::{KeyId, TokenId};
pub use record::{KdfParams, ProvisionerRecord, ProvisionerSet, SealedKey};
