//! Directory configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ottkit_core::KdfParams;

use crate::token::lifetime_secs;
use crate::ProvisionerError;

/// File inside the store root that lists the provisioners.
pub const STORE_FILE: &str = "provisioners.json";

/// Environment variable binaries may use to locate the store root.
pub const ROOT_ENV: &str = "OTTKIT_PATH";

/// Validity window granted to issued tokens unless configured otherwise.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(5 * 60);

/// Directory configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// Root of the configuration store.
    pub root: PathBuf,

    /// Lifetime of every token issued by resolved provisioners.
    pub token_lifetime: Duration,

    /// Argon2id parameters used when sealing new keys.
    pub kdf: KdfParams,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".ottkit"),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            kdf: KdfParams::default(),
        }
    }
}

impl DirectoryConfig {
    /// Configuration rooted at `root` with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Locate the store root from `OTTKIT_PATH`, falling back to `$HOME/.ottkit`.
    ///
    /// Only binaries should call this; the library never reads the environment.
    pub fn from_env() -> Result<Self, ProvisionerError> {
        if let Ok(root) = std::env::var(ROOT_ENV) {
            if !root.is_empty() {
                return Ok(Self::new(root));
            }
        }
        let home = std::env::var("HOME").map_err(|_| {
            ProvisionerError::Config(format!("neither {} nor HOME is set", ROOT_ENV))
        })?;
        Ok(Self::new(Path::new(&home).join(".ottkit")))
    }

    /// Builder method to set the token lifetime.
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Builder method to set the KDF parameters for new keys.
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// Path of the provisioner list.
    pub fn store_path(&self) -> PathBuf {
        self.root.join(STORE_FILE)
    }

    /// Reject settings the issuer cannot honor exactly.
    ///
    /// Token timestamps have second granularity, so the lifetime must be a
    /// positive whole number of seconds.
    pub fn validate(&self) -> Result<(), ProvisionerError> {
        lifetime_secs(self.token_lifetime)?;
        if self.kdf.m_cost == 0 || self.kdf.t_cost == 0 || self.kdf.p_cost == 0 {
            return Err(ProvisionerError::Config(
                "KDF costs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
