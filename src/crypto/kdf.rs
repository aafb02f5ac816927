//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The iteration count is a time-cost tradeoff against offline brute
//! force: high enough that guessing passwords is impractical, low enough
//! that an interactive unlock stays sub-second on typical hardware.
//! Derivation is deterministic — the same password + salt always yields
//! the same key, which is what password verification relies on.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// PBKDF2 iteration count — 600,000 per OWASP recommendation for
/// HMAC-SHA256. Changing this invalidates every existing store, so it
/// is a fixed constant rather than a config knob.
const PBKDF2_ITERATIONS: u32 = 600_000;

/// Derive a 32-byte key from a password and salt.
///
/// Same inputs always produce the same key; different salts produce
/// unrelated keys.
pub fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Generate a cryptographically random 16-byte salt.
pub fn gen_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// A wrapper around a 32-byte derived key that automatically zeroes
/// its memory when dropped.
///
/// The vault manager holds its unlocked key only through this type, so
/// locking the vault (dropping the key) wipes the buffer before the
/// allocation is released.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Create a new `MasterKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Derive a key from a password and salt.
    pub fn derive(password: &str, salt: &[u8]) -> Self {
        Self::new(derive_key(password, salt))
    }

    /// Access the raw key bytes (e.g. to pass to `encrypt`/`decrypt`).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salt_has_fixed_length_and_varies() {
        let s1 = gen_salt();
        let s2 = gen_salt();
        assert_eq!(s1.len(), SALT_LEN);
        assert_ne!(s1, s2);
    }

    #[test]
    fn master_key_matches_free_function() {
        let salt = gen_salt();
        let mk = MasterKey::derive("TestPass123!", &salt);
        assert_eq!(mk.as_bytes(), &derive_key("TestPass123!", &salt));
    }
}
