//! One-time token claims and compact JWS encoding.
//!
//! A token looks like:
//!
//! ```json
//! {
//!   "iss": "mariano",
//!   "sub": "host1",
//!   "aud": "https://ca.example.com/1.0/sign",
//!   "exp": 1700000300,
//!   "nbf": 1700000000,
//!   "iat": 1700000000,
//!   "jti": "9f2c...",
//!   "sha": "ef742f95...",
//!   "sans": ["host1"]
//! }
//! ```

use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::Header;
use ottkit_core::{KeyId, TokenId};
use serde::{Deserialize, Serialize};

use crate::crypto::jwt_algorithm;
use crate::{ProvisionerError, TokenSigner};

/// Path on the CA that accepts signing requests.
pub const SIGN_PATH: &str = "/1.0/sign";

/// Claims of a one-time token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Provisioner name.
    pub iss: String,
    /// Requested subject.
    pub sub: String,
    /// `<ca_url>/1.0/sign`.
    pub aud: String,
    /// Expiry (seconds since epoch).
    pub exp: i64,
    /// Not before (seconds since epoch).
    pub nbf: i64,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Unique token id.
    pub jti: String,
    /// Hex SHA-256 of the CA root file.
    pub sha: String,
    /// Subject alternative names the certificate may carry.
    pub sans: Vec<String>,
}

impl TokenClaims {
    /// Assemble claims for a token issued at `now`.
    ///
    /// `now` is truncated to whole seconds before the window is computed,
    /// so `exp - nbf` is exactly `lifetime` for whole-second lifetimes.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        issuer: &str,
        subject: &str,
        sans: Vec<String>,
        ca_url: &str,
        root_fingerprint: String,
        jti: TokenId,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Result<Self, ProvisionerError> {
        let issued_at = now.timestamp();
        let expiry = issued_at
            .checked_add(lifetime_secs(lifetime)?)
            .ok_or_else(|| ProvisionerError::Config("token lifetime is too large".to_string()))?;

        Ok(Self {
            iss: issuer.to_string(),
            sub: subject.to_string(),
            aud: audience(ca_url),
            exp: expiry,
            nbf: issued_at,
            iat: issued_at,
            jti: jti.into_inner(),
            sha: root_fingerprint,
            sans,
        })
    }
}

/// Whole seconds in a token lifetime.
///
/// Rejects zero and fractional lifetimes, which could not be represented
/// exactly as `exp - nbf`.
pub fn lifetime_secs(lifetime: Duration) -> Result<i64, ProvisionerError> {
    if lifetime.is_zero() {
        return Err(ProvisionerError::Config(
            "token lifetime must be positive".to_string(),
        ));
    }
    if lifetime.subsec_nanos() != 0 {
        return Err(ProvisionerError::Config(format!(
            "token lifetime must be whole seconds, got {:?}",
            lifetime
        )));
    }
    i64::try_from(lifetime.as_secs())
        .map_err(|_| ProvisionerError::Config("token lifetime is too large".to_string()))
}

/// Audience for tokens aimed at the CA at `ca_url`.
pub fn audience(ca_url: &str) -> String {
    format!("{}{}", ca_url.trim_end_matches('/'), SIGN_PATH)
}

/// Sign `claims` and emit `header.payload.signature`, each base64url.
pub fn encode_compact(
    claims: &TokenClaims,
    kid: &KeyId,
    signer: &dyn TokenSigner,
) -> Result<String, ProvisionerError> {
    let mut header = Header::new(jwt_algorithm(signer.algorithm()));
    header.kid = Some(kid.to_string());

    let header_json = serde_json::to_vec(&header)
        .map_err(|e| ProvisionerError::InvalidArgument(format!("token header: {}", e)))?;
    let claims_json = serde_json::to_vec(claims)
        .map_err(|e| ProvisionerError::InvalidArgument(format!("token claims: {}", e)))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );
    let signature = signer.try_sign(signing_input.as_bytes())?;

    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
}
