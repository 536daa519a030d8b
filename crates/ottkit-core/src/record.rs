//! Persisted provisioner records.

use crate::{CoreError, KeyAlgorithm, KeyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Argon2id cost parameters used to derive the key-encryption key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub m_cost: u32,

    /// Number of passes.
    pub t_cost: u32,

    /// Degree of parallelism.
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: 19 * 1024,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

/// A private key sealed under a password.
///
/// All binary fields are hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKey {
    /// KDF parameters the key was sealed with.
    pub kdf: KdfParams,

    /// Argon2id salt.
    pub salt: String,

    /// ChaCha20-Poly1305 nonce.
    pub nonce: String,

    /// Encrypted private key bytes with the authentication tag appended.
    pub ciphertext: String,
}

/// One configured provisioner identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionerRecord {
    /// Human-readable label; empty for anonymous records.
    #[serde(default)]
    pub name: String,

    /// Thumbprint of the public key.
    pub kid: KeyId,

    /// Signing algorithm of the key.
    pub alg: KeyAlgorithm,

    /// Password-protected private key.
    pub encrypted_key: SealedKey,

    /// When the record was provisioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ProvisionerRecord {
    /// Create a new record stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        kid: KeyId,
        alg: KeyAlgorithm,
        encrypted_key: SealedKey,
    ) -> Self {
        Self {
            name: name.into(),
            kid,
            alg,
            encrypted_key,
            created_at: Some(Utc::now()),
        }
    }
}

/// The full list of provisioners held by a configuration store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionerSet {
    pub provisioners: Vec<ProvisionerRecord>,
}

impl ProvisionerSet {
    /// Check the store invariants: every kid is non-empty and unique, and
    /// non-empty names are unique.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut kids = HashSet::new();
        let mut names = HashSet::new();
        for record in &self.provisioners {
            if record.kid.is_empty() {
                return Err(CoreError::EmptyKid);
            }
            if !kids.insert(record.kid.as_str()) {
                return Err(CoreError::DuplicateKid(record.kid.to_string()));
            }
            if !record.name.is_empty() && !names.insert(record.name.as_str()) {
                return Err(CoreError::DuplicateName(record.name.clone()));
            }
        }
        Ok(())
    }

    /// Find a record by exact key identifier.
    pub fn find_by_kid(&self, kid: &str) -> Option<&ProvisionerRecord> {
        self.provisioners.iter().find(|p| p.kid.as_str() == kid)
    }

    /// Find a record by exact, non-empty name.
    pub fn find_by_name(&self, name: &str) -> Option<&ProvisionerRecord> {
        if name.is_empty() {
            return None;
        }
        self.provisioners.iter().find(|p| p.name == name)
    }

    /// Append a record, rejecting anything that would break the invariants.
    pub fn insert(&mut self, record: ProvisionerRecord) -> Result<(), CoreError> {
        if record.kid.is_empty() {
            return Err(CoreError::EmptyKid);
        }
        if self.find_by_kid(record.kid.as_str()).is_some() {
            return Err(CoreError::DuplicateKid(record.kid.to_string()));
        }
        if self.find_by_name(&record.name).is_some() {
            return Err(CoreError::DuplicateName(record.name));
        }
        self.provisioners.push(record);
        Ok(())
    }

    /// Remove the record whose kid or name equals `key`, kid first.
    pub fn remove(&mut self, key: &str) -> Option<ProvisionerRecord> {
        let idx = self
            .provisioners
            .iter()
            .position(|p| p.kid.as_str() == key)
            .or_else(|| {
                if key.is_empty() {
                    None
                } else {
                    self.provisioners.iter().position(|p| p.name == key)
                }
            })?;
        Some(self.provisioners.remove(idx))
    }
}
