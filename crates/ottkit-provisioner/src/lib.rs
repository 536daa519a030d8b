//! Provisioner directory and one-time token (OTT) issuance.
//!
//! A [`Directory`] resolves a configured provisioner by name or key id and
//! unlocks its password-protected key, yielding a [`Provisioner`]. The
//! provisioner then issues short-lived signed tokens a certificate
//! authority accepts as proof that the bearer may request a certificate
//! for a subject.

pub mod config;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod provisioner;
pub mod token;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::DirectoryConfig;
pub use crypto::{Jwk, SigningKey, TokenSigner};
pub use directory::Directory;
pub use error::ProvisionerError;
pub use provisioner::Provisioner;
pub use token::TokenClaims;
