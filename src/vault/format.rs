//! On-disk store format: a single JSON document.
//!
//! ```json
//! {
//!   "salt": "<base64, 16 bytes>",
//!   "key_check": "<base64 ciphertext of a known marker, optional>",
//!   "secrets": { "<name>": "<base64 ciphertext>", ... },
//!   "export_to_env": { "<name>": true, ... }
//! }
//! ```
//!
//! `salt` is required — every ciphertext depends on keys derived from
//! it, so a store without one is unreadable and reported as corrupted
//! rather than silently reset. `key_check` and `export_to_env` are
//! optional for compatibility with stores written before those fields
//! existed: a missing `key_check` means password verification falls
//! back to decrypting the first secret, and a name missing from
//! `export_to_env` is treated as exported.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::gen_salt;
use crate::errors::{Result, VaultError};

use super::lockfile::{harden_permissions, LockedFile};

/// The persisted secrets document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsStore {
    /// Salt for key derivation (base64 in JSON). Generated once,
    /// regenerated only on password change or `clear`.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// Ciphertext of a known marker value under the current key.
    /// Lets us verify a candidate password without any real secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_check: Option<String>,

    /// Secret name -> base64 ciphertext (nonce + encrypted payload).
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,

    /// Secret name -> export-to-environment flag. Absent names default
    /// to `true`.
    #[serde(default)]
    pub export_to_env: BTreeMap<String, bool>,
}

impl SecretsStore {
    /// An empty store with a freshly generated salt.
    pub fn empty() -> Self {
        Self {
            salt: gen_salt().to_vec(),
            key_check: None,
            secrets: BTreeMap::new(),
            export_to_env: BTreeMap::new(),
        }
    }

    /// Load the store from `path`.
    ///
    /// A missing file yields a fresh empty store; nothing is written to
    /// disk until the first mutation. An existing file that cannot be
    /// parsed (bad JSON, missing or undecodable `salt`) is a
    /// [`VaultError::StoreCorrupted`] — never a silent reset, since a
    /// reset would destroy the user's secrets on the next save.
    /// Read failures (e.g. permission denied) surface as
    /// [`VaultError::Io`], distinct from corruption.
    pub fn load(path: &Path) -> Result<Self> {
        // Branch on the open itself rather than a stat beforehand:
        // only a genuinely missing file yields a fresh store, while an
        // unreadable path stays an error.
        let mut guard = match LockedFile::open_read(path) {
            Ok(guard) => guard,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::empty()),
            Err(e) => return Err(e.into()),
        };
        let mut contents = String::new();
        guard.file().read_to_string(&mut contents)?;
        drop(guard);

        let store: SecretsStore = serde_json::from_str(&contents)
            .map_err(|e| VaultError::StoreCorrupted(e.to_string()))?;

        if store.salt.is_empty() {
            return Err(VaultError::StoreCorrupted("empty salt".into()));
        }

        Ok(store)
    }

    /// Write the store to `path` under an exclusive advisory lock.
    ///
    /// The write goes through the locked handle and is flushed to disk
    /// before the lock is released; permissions are then restricted to
    /// the owner (best-effort).
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| VaultError::SerializationError(e.to_string()))?;

        let mut guard = LockedFile::open_write(path)?;
        guard.file().write_all(&json)?;
        guard.file().sync_all()?;
        drop(guard);

        harden_permissions(path);
        Ok(())
    }

    /// Whether a password has ever been set: either a key check is
    /// stored or at least one secret exists.
    pub fn has_password(&self) -> bool {
        self.key_check.is_some() || !self.secrets.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for the base64-encoded salt field
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_fresh_store() {
        let dir = TempDir::new().unwrap();
        let store = SecretsStore::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(store.salt.len(), 16);
        assert!(store.secrets.is_empty());
        assert!(store.key_check.is_none());
        assert!(!store.has_password());
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.json");

        let mut store = SecretsStore::empty();
        store.key_check = Some("check".into());
        store.secrets.insert("API_KEY".into(), "ciphertext".into());
        store.export_to_env.insert("API_KEY".into(), false);
        store.save(&path).unwrap();

        let loaded = SecretsStore::load(&path).unwrap();
        assert_eq!(loaded.salt, store.salt);
        assert_eq!(loaded.key_check.as_deref(), Some("check"));
        assert_eq!(loaded.secrets["API_KEY"], "ciphertext");
        assert_eq!(loaded.export_to_env["API_KEY"], false);
    }

    #[cfg(unix)]
    #[test]
    fn unopenable_path_is_io_error_not_fresh_store() {
        let dir = TempDir::new().unwrap();
        // A regular file in the parent position makes the open fail
        // with something other than NotFound.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let result = SecretsStore::load(&blocker.join("secrets.json"));
        assert!(matches!(result, Err(VaultError::Io(_))));
    }

    #[test]
    fn invalid_json_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, "not json at all").unwrap();

        match SecretsStore::load(&path) {
            Err(VaultError::StoreCorrupted(_)) => {}
            other => panic!("expected StoreCorrupted, got {other:?}"),
        }
    }

    #[test]
    fn valid_json_missing_salt_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, r#"{"secrets": {"A": "xyz"}}"#).unwrap();

        match SecretsStore::load(&path) {
            Err(VaultError::StoreCorrupted(_)) => {}
            other => panic!("expected StoreCorrupted, got {other:?}"),
        }
    }

    #[test]
    fn undecodable_salt_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, r#"{"salt": "!!not-base64!!"}"#).unwrap();

        assert!(matches!(
            SecretsStore::load(&path),
            Err(VaultError::StoreCorrupted(_))
        ));
    }

    #[test]
    fn legacy_store_without_optional_fields_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(
            &path,
            r#"{"salt": "AAAAAAAAAAAAAAAAAAAAAA==", "secrets": {"OLD": "ct"}}"#,
        )
        .unwrap();

        let store = SecretsStore::load(&path).unwrap();
        assert!(store.key_check.is_none());
        assert!(store.export_to_env.is_empty());
        // A store with secrets counts as having a password even without
        // a key check.
        assert!(store.has_password());
    }
}
