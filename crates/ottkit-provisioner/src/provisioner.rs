//! An unlocked provisioner that issues one-time tokens.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use ottkit_core::{KeyAlgorithm, KeyId, TokenId};
use tracing::debug;

use crate::crypto::{fingerprint_file, Jwk};
use crate::token::{encode_compact, TokenClaims};
use crate::{ProvisionerError, TokenSigner};

/// An authenticated identity able to vouch for certificate requests.
///
/// Built by [`crate::Directory::resolve`] and never mutated afterwards.
/// Dropping it drops the signing key, which zeroizes the secret.
pub struct Provisioner {
    name: String,
    kid: KeyId,
    ca_url: String,
    ca_root: PathBuf,
    signer: Option<Box<dyn TokenSigner>>,
    token_lifetime: Duration,
}

impl Provisioner {
    /// Assemble a provisioner from its parts.
    ///
    /// `signer` may be `None`; issuing then fails with
    /// [`ProvisionerError::SigningUnavailable`].
    pub fn new(
        name: impl Into<String>,
        kid: KeyId,
        ca_url: impl Into<String>,
        ca_root: impl Into<PathBuf>,
        signer: Option<Box<dyn TokenSigner>>,
        token_lifetime: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            kid,
            ca_url: ca_url.into(),
            ca_root: ca_root.into(),
            signer,
            token_lifetime,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kid(&self) -> &KeyId {
        &self.kid
    }

    pub fn ca_url(&self) -> &str {
        &self.ca_url
    }

    pub fn ca_root(&self) -> &Path {
        &self.ca_root
    }

    pub fn token_lifetime(&self) -> Duration {
        self.token_lifetime
    }

    /// Algorithm of the signing key, if one is present.
    pub fn algorithm(&self) -> Option<KeyAlgorithm> {
        self.signer.as_ref().map(|s| s.algorithm())
    }

    /// Public key with `kid` set, for configuring the CA.
    pub fn public_jwk(&self) -> Option<Jwk> {
        self.signer.as_ref().map(|s| {
            let mut jwk = s.public_jwk();
            jwk.kid = Some(self.kid.to_string());
            jwk
        })
    }

    /// Issue a token for `subject` whose only SAN is the subject itself.
    pub fn issue_token(&self, subject: &str) -> Result<String, ProvisionerError> {
        self.issue_token_with_sans(subject, &[])
    }

    /// Issue a token for `subject` that also covers `sans`.
    ///
    /// The subject is always the first SAN. Duplicates are dropped, first
    /// occurrence wins.
    pub fn issue_token_with_sans(
        &self,
        subject: &str,
        sans: &[String],
    ) -> Result<String, ProvisionerError> {
        let claims = self.claims_at(subject, sans, Utc::now())?;
        let signer = self.signer()?;
        let token = encode_compact(&claims, &self.kid, signer)?;

        debug!(
            kid = %self.kid,
            subject = %claims.sub,
            jti = %claims.jti,
            exp = claims.exp,
            "Issued one-time token"
        );
        Ok(token)
    }

    /// Build the claims a token issued at `now` would carry.
    ///
    /// Reads and fingerprints the CA root and draws a fresh `jti`.
    pub fn claims_at(
        &self,
        subject: &str,
        sans: &[String],
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, ProvisionerError> {
        if subject.is_empty() {
            return Err(ProvisionerError::InvalidArgument(
                "subject cannot be empty".to_string(),
            ));
        }
        let sans = normalize_sans(subject, sans)?;
        let sha = fingerprint_file(&self.ca_root)?;

        TokenClaims::build(
            &self.name,
            subject,
            sans,
            &self.ca_url,
            sha,
            TokenId::generate(),
            now,
            self.token_lifetime,
        )
    }

    fn signer(&self) -> Result<&dyn TokenSigner, ProvisionerError> {
        self.signer
            .as_deref()
            .ok_or_else(|| ProvisionerError::SigningUnavailable("no signing key".to_string()))
    }
}

impl fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("name", &self.name)
            .field("kid", &self.kid)
            .field("ca_url", &self.ca_url)
            .field("ca_root", &self.ca_root)
            .field("algorithm", &self.algorithm())
            .field("token_lifetime", &self.token_lifetime)
            .finish()
    }
}

fn normalize_sans(subject: &str, sans: &[String]) -> Result<Vec<String>, ProvisionerError> {
    let mut out: Vec<String> = Vec::with_capacity(sans.len() + 1);
    out.push(subject.to_string());
    for san in sans {
        if san.is_empty() {
            return Err(ProvisionerError::InvalidArgument(
                "SAN entries cannot be empty".to_string(),
            ));
        }
        if !out.contains(san) {
            out.push(san.clone());
        }
    }
    Ok(out)
}
