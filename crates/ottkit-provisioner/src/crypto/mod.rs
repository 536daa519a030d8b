//! Cryptographic building blocks for provisioners.

mod fingerprint;
mod jwk;
mod sealed;
mod signer;

pub use fingerprint::{fingerprint_bytes, fingerprint_file};
pub use jwk::Jwk;
pub use sealed::{burn_kdf, seal_key, unseal_key};
pub use signer::{SigningKey, TokenSigner};
pub(crate) use signer::jwt_algorithm;
