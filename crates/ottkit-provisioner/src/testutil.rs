//! Shared helpers for unit tests.

use std::path::PathBuf;
use std::time::Duration;

use jsonwebtoken::{TokenData, Validation};
use ottkit_core::KdfParams;
use tempfile::TempDir;

use crate::crypto::{jwt_algorithm, Jwk};
use crate::token::audience;
use crate::{Directory, DirectoryConfig, TokenClaims};

pub(crate) const PASSWORD: &[u8] = b"password";

/// Argon2id parameters cheap enough for debug-build tests.
pub(crate) fn cheap_kdf() -> KdfParams {
    KdfParams {
        m_cost: 64,
        t_cost: 1,
        p_cost: 1,
    }
}

/// A scratch store root holding a self-signed CA root certificate.
pub(crate) struct TestStore {
    pub dir: TempDir,
    pub root_cert: PathBuf,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root_cert = dir.path().join("root_ca.crt");
        let rcgen::CertifiedKey { cert, .. } =
            rcgen::generate_simple_self_signed(vec!["ottkit test root".to_string()]).unwrap();
        std::fs::write(&root_cert, cert.pem()).unwrap();
        Self { dir, root_cert }
    }

    pub fn config(&self) -> DirectoryConfig {
        DirectoryConfig::new(self.dir.path().join("config"))
            .with_kdf(cheap_kdf())
            .with_token_lifetime(Duration::from_secs(5 * 60))
    }

    pub fn directory(&self) -> Directory {
        Directory::new(self.config()).unwrap()
    }
}

/// Verify a token the way a CA would, with one minute of leeway.
pub(crate) fn verify_token(
    token: &str,
    jwk: &Jwk,
    ca_url: &str,
    issuer: &str,
    subject: &str,
) -> Result<TokenData<TokenClaims>, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(jwt_algorithm(jwk.alg));
    validation.leeway = 60;
    validation.validate_nbf = true;
    validation.set_audience(&[audience(ca_url)]);
    validation.set_issuer(&[issuer]);
    validation.sub = Some(subject.to_string());
    validation.set_required_spec_claims(&["exp", "nbf", "aud", "iss", "sub"]);

    let key = jwk.decoding_key().unwrap();
    jsonwebtoken::decode::<TokenClaims>(token, &key, &validation)
}
