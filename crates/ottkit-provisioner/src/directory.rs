//! Provisioner directory backed by a configuration store on disk.
//!
//! The store is a single JSON file, `<root>/provisioners.json`:
//!
//! ```json
//! {
//!   "provisioners": [
//!     { "name": "mariano", "kid": "FLIV7q...", "alg": "ES256", "encryptedKey": { ... } }
//!   ]
//! }
//! ```

use std::io::Write;
use std::path::Path;

use ottkit_core::{KdfParams, KeyAlgorithm, ProvisionerRecord, ProvisionerSet};
use tracing::{debug, info};

use crate::crypto::{burn_kdf, seal_key, unseal_key};
use crate::{DirectoryConfig, Provisioner, ProvisionerError, SigningKey, TokenSigner};

/// Resolves provisioners from one configuration store.
///
/// Independent directories may coexist in a process; nothing here reads
/// process-wide state.
#[derive(Debug, Clone)]
pub struct Directory {
    config: DirectoryConfig,
}

impl Directory {
    /// Create a directory over the store described by `config`.
    pub fn new(config: DirectoryConfig) -> Result<Self, ProvisionerError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// All configured provisioners. Nothing is decrypted.
    pub fn list(&self) -> Result<Vec<ProvisionerRecord>, ProvisionerError> {
        Ok(self.load()?.provisioners)
    }

    /// Find the provisioner matching `kid` (preferred) or `name`, unlock it
    /// with `password`, and bind it to the CA at `ca_url` trusting `ca_root`.
    ///
    /// The returned provisioner carries the stored record's name, which may
    /// be empty when resolved by kid.
    pub fn resolve(
        &self,
        name: &str,
        kid: &str,
        ca_url: &str,
        ca_root: impl AsRef<Path>,
        password: &[u8],
    ) -> Result<Provisioner, ProvisionerError> {
        debug!(name, kid, "Resolving provisioner");
        let set = self.load()?;

        let record = if !kid.is_empty() {
            set.find_by_kid(kid)
        } else {
            set.find_by_name(name)
        };
        let Some(record) = record else {
            burn_kdf(password, self.decoy_kdf(&set));
            let what = if kid.is_empty() {
                format!("name '{}'", name)
            } else {
                format!("kid '{}'", kid)
            };
            return Err(ProvisionerError::NotFound(what));
        };

        let secret = unseal_key(&record.encrypted_key, &record.kid, password)?;
        let key = SigningKey::from_bytes(record.alg, &secret)?;
        if key.public_jwk().thumbprint() != record.kid {
            return Err(ProvisionerError::DecryptionFailed);
        }

        info!(
            name = %record.name,
            kid = %record.kid,
            alg = %record.alg,
            "Provisioner unlocked"
        );

        Ok(Provisioner::new(
            record.name.clone(),
            record.kid.clone(),
            ca_url,
            ca_root.as_ref(),
            Some(Box::new(key)),
            self.config.token_lifetime,
        ))
    }

    /// Generate a new key, seal it under `password` and store it as `name`.
    ///
    /// `name` may be empty for an anonymous provisioner.
    pub fn add(
        &self,
        name: &str,
        alg: KeyAlgorithm,
        password: &[u8],
    ) -> Result<ProvisionerRecord, ProvisionerError> {
        if password.is_empty() {
            return Err(ProvisionerError::InvalidArgument(
                "password cannot be empty".to_string(),
            ));
        }
        let mut set = self.load()?;

        let key = SigningKey::generate(alg);
        let kid = key.public_jwk().thumbprint();
        let sealed = seal_key(&key.to_bytes(), &kid, password, self.config.kdf)?;
        let record = ProvisionerRecord::new(name, kid, alg, sealed);

        set.insert(record.clone())?;
        self.save(&set)?;

        info!(name, kid = %record.kid, alg = %alg, "Provisioner added");
        Ok(record)
    }

    /// Delete the provisioner whose kid or name equals `key`.
    pub fn remove(&self, key: &str) -> Result<ProvisionerRecord, ProvisionerError> {
        let mut set = self.load()?;
        let removed = set
            .remove(key)
            .ok_or_else(|| ProvisionerError::NotFound(format!("'{}'", key)))?;
        self.save(&set)?;

        info!(name = %removed.name, kid = %removed.kid, "Provisioner removed");
        Ok(removed)
    }

    /// KDF costs to spend on a lookup miss: those of a stored record, so a
    /// miss costs the same as a wrong password.
    fn decoy_kdf<'a>(&'a self, set: &'a ProvisionerSet) -> &'a KdfParams {
        set.provisioners
            .first()
            .map_or(&self.config.kdf, |r| &r.encrypted_key.kdf)
    }

    /// Load the whole store. A missing file is an empty store.
    fn load(&self) -> Result<ProvisionerSet, ProvisionerError> {
        let path = self.config.store_path();
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Store file absent, treating as empty");
                return Ok(ProvisionerSet::default());
            }
            Err(source) => return Err(ProvisionerError::Unreadable { path, source }),
        };

        let set: ProvisionerSet =
            serde_json::from_slice(&data).map_err(|e| ProvisionerError::Store {
                path: path.clone(),
                message: e.to_string(),
            })?;
        set.validate().map_err(|e| ProvisionerError::Store {
            path,
            message: e.to_string(),
        })?;
        Ok(set)
    }

    /// Replace the store file atomically.
    fn save(&self, set: &ProvisionerSet) -> Result<(), ProvisionerError> {
        let root = &self.config.root;
        let path = self.config.store_path();

        std::fs::create_dir_all(root).map_err(|e| write_error(root, e))?;
        let json = serde_json::to_vec_pretty(set).map_err(|e| ProvisionerError::Store {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let tmp = path.with_extension("json.tmp");
        let mut file = std::fs::File::create(&tmp).map_err(|e| write_error(&tmp, e))?;
        file.write_all(&json).map_err(|e| write_error(&tmp, e))?;
        file.sync_all().map_err(|e| write_error(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| write_error(&path, e))?;
        Ok(())
    }
}

fn write_error(path: &Path, source: std::io::Error) -> ProvisionerError {
    ProvisionerError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{verify_token, TestStore, PASSWORD};
    use ottkit_core::KeyId;

    const CA_URL: &str = "https://127.0.0.1:9000";

    struct Seeded {
        store: TestStore,
        directory: Directory,
        named: ProvisionerRecord,
        anonymous: ProvisionerRecord,
    }

    fn seeded() -> Seeded {
        let store = TestStore::new();
        let directory = store.directory();
        let named = directory.add("mariano", KeyAlgorithm::Es256, PASSWORD).unwrap();
        let anonymous = directory.add("", KeyAlgorithm::EdDsa, PASSWORD).unwrap();
        Seeded {
            store,
            directory,
            named,
            anonymous,
        }
    }

    #[test]
    fn test_resolve_ok() {
        let s = seeded();
        let kid = s.named.kid.as_str();
        let root = &s.store.root_cert;

        for (name, kid) in [("mariano", kid), ("", kid), ("mariano", "")] {
            let p = s.directory.resolve(name, kid, CA_URL, root, PASSWORD).unwrap();
            assert_eq!(p.name(), "mariano");
            assert_eq!(p.kid(), &s.named.kid);
            assert_eq!(p.ca_url(), CA_URL);
            assert_eq!(p.ca_root(), root.as_path());
            assert_eq!(p.token_lifetime(), s.directory.config().token_lifetime);
            assert_eq!(p.algorithm(), Some(KeyAlgorithm::Es256));
        }
    }

    #[test]
    fn test_resolve_by_kid_uses_record_name() {
        let s = seeded();
        let p = s
            .directory
            .resolve("", s.anonymous.kid.as_str(), CA_URL, &s.store.root_cert, PASSWORD)
            .unwrap();
        assert_eq!(p.name(), "");
        assert_eq!(p.algorithm(), Some(KeyAlgorithm::EdDsa));

        // kid wins over a mismatching name
        let p = s
            .directory
            .resolve("mariano", s.anonymous.kid.as_str(), CA_URL, &s.store.root_cert, PASSWORD)
            .unwrap();
        assert_eq!(p.name(), "");
    }

    #[test]
    fn test_resolve_not_found() {
        let s = seeded();
        let root = &s.store.root_cert;

        let err = s.directory.resolve("mariano", "bad-kid", CA_URL, root, PASSWORD).unwrap_err();
        assert!(matches!(err, ProvisionerError::NotFound(_)));

        let err = s.directory.resolve("bad-name", "", CA_URL, root, PASSWORD).unwrap_err();
        assert!(matches!(err, ProvisionerError::NotFound(_)));

        let err = s.directory.resolve("", "", CA_URL, root, PASSWORD).unwrap_err();
        assert!(matches!(err, ProvisionerError::NotFound(_)));
    }

    #[test]
    fn test_resolve_wrong_password() {
        let s = seeded();
        let root = &s.store.root_cert;

        let err = s
            .directory
            .resolve("", s.named.kid.as_str(), CA_URL, root, b"bad-password")
            .unwrap_err();
        assert!(matches!(err, ProvisionerError::DecryptionFailed));

        let err = s
            .directory
            .resolve("mariano", "", CA_URL, root, b"bad-password")
            .unwrap_err();
        assert!(matches!(err, ProvisionerError::DecryptionFailed));
    }

    #[test]
    fn test_resolve_rejects_swapped_key() {
        let s = seeded();
        let mut set = s.directory.load().unwrap();
        // A foreign key sealed under the named record's kid opens fine but
        // its thumbprint no longer matches.
        let other = SigningKey::generate(KeyAlgorithm::Es256);
        let named_kid = s.named.kid.clone();
        let sealed =
            seal_key(&other.to_bytes(), &named_kid, PASSWORD, s.directory.config().kdf).unwrap();
        set.provisioners
            .iter_mut()
            .find(|r| r.kid == named_kid)
            .unwrap()
            .encrypted_key = sealed;
        s.directory.save(&set).unwrap();

        let err = s
            .directory
            .resolve("", named_kid.as_str(), CA_URL, &s.store.root_cert, PASSWORD)
            .unwrap_err();
        assert!(matches!(err, ProvisionerError::DecryptionFailed));
    }

    #[test]
    fn test_miss_spends_stored_kdf_costs() {
        let s = seeded();
        let empty = ProvisionerSet::default();
        assert_eq!(s.directory.decoy_kdf(&empty), &s.directory.config().kdf);

        // Records sealed under other costs than the current config.
        let stronger = KdfParams {
            m_cost: 128,
            t_cost: 2,
            p_cost: 1,
        };
        let directory = Directory::new(s.directory.config().clone().with_kdf(stronger)).unwrap();
        let set = directory.load().unwrap();
        assert_eq!(directory.decoy_kdf(&set), &s.named.encrypted_key.kdf);
        assert_ne!(directory.decoy_kdf(&set), &stronger);

        let err = directory
            .resolve("nobody", "", CA_URL, &s.store.root_cert, PASSWORD)
            .unwrap_err();
        assert!(matches!(err, ProvisionerError::NotFound(_)));
    }

    #[test]
    fn test_resolved_tokens_verify() {
        let s = seeded();
        let p = s
            .directory
            .resolve("mariano", "", CA_URL, &s.store.root_cert, PASSWORD)
            .unwrap();
        let token = p.issue_token("host1").unwrap();
        let jwk = p.public_jwk().unwrap();
        assert_eq!(jwk.thumbprint(), s.named.kid);

        let data = verify_token(&token, &jwk, CA_URL, "mariano", "host1").unwrap();
        assert_eq!(data.claims.sans, vec!["host1".to_string()]);
    }

    #[test]
    fn test_list_add_remove() {
        let store = TestStore::new();
        let directory = store.directory();
        assert!(directory.list().unwrap().is_empty());

        let a = directory.add("a", KeyAlgorithm::Es256, PASSWORD).unwrap();
        assert!(matches!(
            directory.add("a", KeyAlgorithm::EdDsa, PASSWORD),
            Err(ProvisionerError::InvalidArgument(_))
        ));
        assert!(matches!(
            directory.add("b", KeyAlgorithm::EdDsa, b""),
            Err(ProvisionerError::InvalidArgument(_))
        ));
        let b = directory.add("b", KeyAlgorithm::EdDsa, PASSWORD).unwrap();

        let names: Vec<String> = directory.list().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);

        assert_eq!(directory.remove("a").unwrap().kid, a.kid);
        assert_eq!(directory.remove(b.kid.as_str()).unwrap().name, "b");
        assert!(matches!(directory.remove("a"), Err(ProvisionerError::NotFound(_))));
        assert!(directory.list().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_store() {
        let store = TestStore::new();
        let directory = store.directory();
        std::fs::create_dir_all(&directory.config().root).unwrap();
        std::fs::write(directory.config().store_path(), b"{ not json").unwrap();

        assert!(matches!(directory.list(), Err(ProvisionerError::Store { .. })));

        let mut set = ProvisionerSet::default();
        let record = seeded().named;
        set.provisioners.push(record.clone());
        set.provisioners.push(ProvisionerRecord {
            kid: KeyId::new("other"),
            ..record
        });
        std::fs::write(
            directory.config().store_path(),
            serde_json::to_vec(&set).unwrap(),
        )
        .unwrap();
        assert!(matches!(directory.list(), Err(ProvisionerError::Store { .. })));
    }

    #[test]
    fn test_directories_are_independent() {
        let a = seeded();
        let b_store = TestStore::new();
        let b = b_store.directory();
        assert_eq!(a.directory.list().unwrap().len(), 2);
        assert!(b.list().unwrap().is_empty());
        assert!(matches!(
            b.resolve("mariano", "", CA_URL, &a.store.root_cert, PASSWORD),
            Err(ProvisionerError::NotFound(_))
        ));
    }
}
