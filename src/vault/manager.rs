//! High-level vault operations used by the composing application.
//!
//! `VaultManager` wraps the store format and the crypto layer so the
//! settings layer can work with simple calls like
//! `vault.add_secret("OPENAI_API_KEY", "sk-...")`. It holds the only
//! mutable state in the crate: the loaded store document and, while
//! unlocked, the derived key. Secrets are decrypted on demand — no
//! plaintext cache is kept.
//!
//! Error-handling contract: every operation fails loudly by default
//! (typed `VaultError`s the UI can map to notifications). Where the UI
//! wants "attempt and show nothing on failure", the best-effort
//! variants (`try_unlock`, `get_secret_or`, `import_to_env_lenient`)
//! log and return a safe default instead.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::crypto::encryption::{decrypt, encrypt};
use crate::crypto::kdf::{gen_salt, MasterKey};
use crate::crypto::wipe::{wipe_map, wipe_string};
use crate::errors::{Result, VaultError};

use super::format::SecretsStore;
use super::password::validate_password;

/// Known marker encrypted into `key_check` so a candidate password can
/// be verified without any real secret present. The value itself is
/// not sensitive; only the ciphertext matters.
const KEY_CHECK_MARKER: &str = "credvault-key-check-v1";

/// The main vault handle. One instance per store file, living for the
/// process lifetime; construct it explicitly and pass it into the UI
/// layer rather than holding a process-wide singleton.
pub struct VaultManager {
    /// Path to the JSON store file on disk.
    path: PathBuf,

    /// The loaded store document. Mutations persist immediately.
    store: SecretsStore,

    /// The derived key, held only while unlocked (zeroized on drop).
    key: Option<MasterKey>,
}

impl VaultManager {
    // ------------------------------------------------------------------
    // Construction and state
    // ------------------------------------------------------------------

    /// Load (or initialize) the store at `path` and start locked.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let store = SecretsStore::load(&path)?;
        Ok(Self {
            path,
            store,
            key: None,
        })
    }

    /// Path to the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True iff no valid derived key is currently held in memory.
    pub fn locked(&self) -> bool {
        self.key.is_none()
    }

    /// True iff a password has ever been set (a key check or at least
    /// one secret exists).
    pub fn has_password(&self) -> bool {
        self.store.has_password()
    }

    /// Number of secrets stored.
    pub fn len(&self) -> usize {
        self.store.secrets.len()
    }

    /// True iff no secrets are stored.
    pub fn is_empty(&self) -> bool {
        self.store.secrets.is_empty()
    }

    /// Whether a secret with this name exists. Metadata-only check —
    /// works while locked, no decryption performed.
    pub fn contains(&self, key: &str) -> bool {
        self.store.secrets.contains_key(key.trim())
    }

    // ------------------------------------------------------------------
    // Password lifecycle
    // ------------------------------------------------------------------

    /// Unlock the vault, or set the initial vault password.
    ///
    /// First-time use validates the password's strength, stores a key
    /// check, and persists. On an existing vault the candidate is
    /// verified against the key check (or, for legacy stores without
    /// one, the first secret); the wrong password locks the vault and
    /// returns [`VaultError::InvalidPassword`].
    pub fn unlock(&mut self, password: &str) -> Result<()> {
        if !self.has_password() {
            validate_password(password)?;
            let key = MasterKey::derive(password, &self.store.salt);
            self.store.key_check = Some(encrypt(KEY_CHECK_MARKER, key.as_bytes())?);
            self.key = Some(key);
            return self.save();
        }

        let key = MasterKey::derive(password, &self.store.salt);
        if !self.key_is_valid(&key) {
            self.lock();
            return Err(VaultError::InvalidPassword);
        }

        // Legacy stores predate the key check; backfill one now that a
        // verified key is in hand.
        let backfill = self.store.key_check.is_none();
        if backfill {
            self.store.key_check = Some(encrypt(KEY_CHECK_MARKER, key.as_bytes())?);
        }
        self.key = Some(key);
        if backfill {
            self.save()?;
        }
        Ok(())
    }

    /// Best-effort unlock: logs instead of failing.
    pub fn try_unlock(&mut self, password: &str) -> bool {
        match self.unlock(password) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "unlock failed");
                false
            }
        }
    }

    /// Lock the vault, dropping (and thereby zeroizing) the held key.
    /// Always succeeds.
    pub fn lock(&mut self) {
        self.key = None;
    }

    /// Verify a candidate password without changing the lock state.
    ///
    /// Never errors on a wrong password — that is an `Ok(false)`.
    /// Errors only with [`VaultError::NoPassword`] when the vault has
    /// never had a password set, so there is nothing to check against.
    pub fn verify_password(&self, password: &str) -> Result<bool> {
        if !self.has_password() {
            return Err(VaultError::NoPassword);
        }
        let key = MasterKey::derive(password, &self.store.salt);
        Ok(self.key_is_valid(&key))
    }

    /// Change the vault password, re-encrypting every secret.
    ///
    /// A fresh salt is generated, so every ciphertext (including the
    /// key check) is rebuilt under the new key — entirely in memory
    /// first, then written in a single save. Any failure along the way
    /// leaves both the in-memory store and the file untouched.
    /// Changing to the same password is a no-op success.
    pub fn change_password(&mut self, old_password: &str, new_password: &str) -> Result<()> {
        if !self.has_password() {
            return self.unlock(new_password);
        }
        if !self.verify_password(old_password)? {
            return Err(VaultError::InvalidPassword);
        }
        if old_password == new_password {
            return Ok(());
        }
        validate_password(new_password)?;

        let old_key = MasterKey::derive(old_password, &self.store.salt);
        let new_salt = gen_salt();
        let new_key = MasterKey::derive(new_password, &new_salt);

        // Re-encrypt everything into a candidate store before touching
        // disk, so a mid-way failure cannot strand a half-rekeyed file.
        let mut reencrypted = BTreeMap::new();
        for (name, ciphertext) in &self.store.secrets {
            let mut plaintext = decrypt(ciphertext, old_key.as_bytes())?;
            let new_ciphertext = encrypt(&plaintext, new_key.as_bytes());
            wipe_string(&mut plaintext);
            reencrypted.insert(name.clone(), new_ciphertext?);
        }

        let mut candidate = self.store.clone();
        candidate.salt = new_salt.to_vec();
        candidate.secrets = reencrypted;
        candidate.key_check = Some(encrypt(KEY_CHECK_MARKER, new_key.as_bytes())?);
        candidate.save(&self.path)?;

        self.store = candidate;
        // Replacing the held key drops (and zeroizes) the previous one.
        self.key = Some(new_key);
        Ok(())
    }

    /// Wipe all secrets and the password, returning to the
    /// never-had-a-password state with a fresh salt.
    pub fn clear(&mut self) -> Result<()> {
        wipe_map(&mut self.store.secrets);
        self.store.export_to_env.clear();
        self.store.key_check = None;
        self.store.salt = gen_salt().to_vec();
        self.lock();
        self.save()
    }

    // ------------------------------------------------------------------
    // Secret CRUD
    // ------------------------------------------------------------------

    /// Add or overwrite a secret, exported to the environment by
    /// default. Requires the vault to be unlocked; persists immediately.
    pub fn add_secret(&mut self, key: &str, value: &str) -> Result<()> {
        self.add_secret_with_export(key, value, true)
    }

    /// Add or overwrite a secret with an explicit export flag.
    pub fn add_secret_with_export(
        &mut self,
        key: &str,
        value: &str,
        export_to_env: bool,
    ) -> Result<()> {
        let key = normalize_key(key)?;
        let master = self.require_unlocked()?;

        let ciphertext = encrypt(value, master.as_bytes())?;
        self.store.secrets.insert(key.clone(), ciphertext);
        self.store.export_to_env.insert(key, export_to_env);
        self.save()
    }

    /// Decrypt and return a secret's value.
    pub fn get_secret(&self, key: &str) -> Result<String> {
        let key = normalize_key(key)?;
        let master = self.require_unlocked()?;

        let ciphertext = self
            .store
            .secrets
            .get(&key)
            .ok_or(VaultError::SecretNotFound(key))?;
        decrypt(ciphertext, master.as_bytes())
    }

    /// Best-effort read: returns `default` on any failure (locked,
    /// missing key, decryption error) instead of erroring.
    pub fn get_secret_or(&self, key: &str, default: &str) -> String {
        match self.get_secret(key) {
            Ok(value) => value,
            Err(e) => {
                debug!(key, error = %e, "get_secret fell back to default");
                default.to_string()
            }
        }
    }

    /// One-shot read with an explicitly supplied password.
    ///
    /// Derives a throwaway key from the password and the store's salt;
    /// the manager's locked/unlocked state is not consulted and not
    /// changed. Used by "peek without fully unlocking" flows.
    pub fn get_secret_with_pw(&self, key: &str, password: &str) -> Result<String> {
        let key = normalize_key(key)?;
        let ciphertext = self
            .store
            .secrets
            .get(&key)
            .ok_or(VaultError::SecretNotFound(key))?;

        let master = MasterKey::derive(password, &self.store.salt);
        decrypt(ciphertext, master.as_bytes())
    }

    /// Remove a secret and its export flag; persists immediately.
    /// Works while locked — removal needs no decryption.
    pub fn remove_secret(&mut self, key: &str) -> Result<()> {
        let key = normalize_key(key)?;
        if self.store.secrets.remove(&key).is_none() {
            return Err(VaultError::SecretNotFound(key));
        }
        self.store.export_to_env.remove(&key);
        self.save()
    }

    // ------------------------------------------------------------------
    // Environment export
    // ------------------------------------------------------------------

    /// Read a secret's export flag. Names without a stored flag
    /// (including unknown names) default to exported — stores written
    /// before the flag existed exported everything.
    pub fn get_export_to_env(&self, key: &str) -> bool {
        self.store
            .export_to_env
            .get(key.trim())
            .copied()
            .unwrap_or(true)
    }

    /// Update the export flag of an existing secret.
    pub fn set_export_to_env(&mut self, key: &str, export: bool) -> Result<()> {
        let key = normalize_key(key)?;
        if !self.store.secrets.contains_key(&key) {
            return Err(VaultError::SecretNotFound(key));
        }
        self.store.export_to_env.insert(key, export);
        self.save()
    }

    /// Decrypt every exported secret into the process environment,
    /// each under its own name. Returns the number exported.
    ///
    /// Strict mode: the first decryption failure aborts with an error.
    /// Variables set before the failure stay set — there is no
    /// rollback.
    pub fn import_to_env(&self) -> Result<usize> {
        self.require_unlocked()?;

        let mut exported = 0;
        for name in self.store.secrets.keys() {
            if !self.get_export_to_env(name) {
                continue;
            }
            let mut value = self.get_secret(name)?;
            if !value.is_empty() {
                std::env::set_var(name, &value);
                exported += 1;
            }
            wipe_string(&mut value);
        }
        Ok(exported)
    }

    /// Best-effort environment export: skips secrets that fail to
    /// decrypt (with a warning) and does nothing while locked.
    pub fn import_to_env_lenient(&self) -> usize {
        if self.locked() {
            debug!("vault locked, skipping environment export");
            return 0;
        }

        let mut exported = 0;
        for name in self.store.secrets.keys() {
            if !self.get_export_to_env(name) {
                continue;
            }
            match self.get_secret(name) {
                Ok(mut value) => {
                    if !value.is_empty() {
                        std::env::set_var(name, &value);
                        exported += 1;
                    }
                    wipe_string(&mut value);
                }
                Err(e) => {
                    warn!(key = %name, error = %e, "skipping secret during environment export");
                }
            }
        }
        exported
    }

    // ------------------------------------------------------------------
    // Dict-like convenience surface
    // ------------------------------------------------------------------

    /// Alias for [`get_secret`](Self::get_secret).
    pub fn get(&self, key: &str) -> Result<String> {
        self.get_secret(key)
    }

    /// Alias for [`add_secret`](Self::add_secret).
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.add_secret(key, value)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn save(&self) -> Result<()> {
        self.store.save(&self.path)
    }

    fn require_unlocked(&self) -> Result<&MasterKey> {
        self.key.as_ref().ok_or(VaultError::VaultLocked)
    }

    /// Check a derived key against the store: decrypt the key check
    /// and compare the marker in constant time, or — for legacy stores
    /// without one — try the first secret.
    fn key_is_valid(&self, key: &MasterKey) -> bool {
        if let Some(ref check) = self.store.key_check {
            return match decrypt(check, key.as_bytes()) {
                Ok(mut marker) => {
                    let ok: bool = marker
                        .as_bytes()
                        .ct_eq(KEY_CHECK_MARKER.as_bytes())
                        .into();
                    wipe_string(&mut marker);
                    ok
                }
                Err(_) => false,
            };
        }
        match self.store.secrets.values().next() {
            Some(ciphertext) => match decrypt(ciphertext, key.as_bytes()) {
                Ok(mut plaintext) => {
                    wipe_string(&mut plaintext);
                    true
                }
                Err(_) => false,
            },
            // Unreachable through the public API: no key check and no
            // secrets means has_password() is false.
            None => false,
        }
    }
}

fn normalize_key(key: &str) -> Result<String> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(VaultError::InvalidKey(
            "secret name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
