//! AES-256-GCM authenticated encryption of single strings.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce,
//! prepends it to the ciphertext, and base64-encodes the whole blob so
//! it can be stored as one JSON string value.
//!
//! Layout of the encoded byte buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]
//!
//! A wrong key fails the auth-tag check, so `decrypt` never returns
//! silently corrupted plaintext.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroize;

use crate::crypto::kdf::derive_key;
use crate::errors::{Result, VaultError};

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Size of the GCM auth tag in bytes.
const TAG_LEN: usize = 16;

/// Encrypt `plaintext` with a 32-byte `key`.
///
/// Returns base64(nonce || ciphertext || tag). Empty strings and
/// arbitrary Unicode round-trip exactly.
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<String> {
    // Build the cipher from the raw key bytes.
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    // Generate a random 12-byte nonce — never reused under the same key.
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    // Encrypt and authenticate the plaintext.
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| VaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    // Prepend the nonce so the store only holds one string per secret.
    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(blob))
}

/// Decrypt a string that was produced by `encrypt`.
///
/// Fails with [`VaultError::DecryptionFailed`] on malformed base64,
/// truncated data, a wrong key (auth-tag mismatch), or plaintext that
/// is not valid UTF-8.
pub fn decrypt(ciphertext: &str, key: &[u8]) -> Result<String> {
    let blob = BASE64
        .decode(ciphertext)
        .map_err(|_| VaultError::DecryptionFailed)?;

    // Make sure we have at least a nonce and an auth tag worth of bytes.
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(VaultError::DecryptionFailed);
    }

    // Split nonce from ciphertext.
    let (nonce_bytes, encrypted) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| VaultError::DecryptionFailed)?;

    // Decrypt and verify the auth tag.
    let plaintext_bytes = cipher
        .decrypt(nonce, encrypted)
        .map_err(|_| VaultError::DecryptionFailed)?;

    // Convert to String via from_utf8 which takes ownership (no clone).
    // On error, zeroize the bytes inside the error before discarding.
    String::from_utf8(plaintext_bytes).map_err(|e| {
        let mut bad_bytes = e.into_bytes();
        bad_bytes.zeroize();
        VaultError::DecryptionFailed
    })
}

/// Encrypt `plaintext` with a key derived from `password` and `salt`.
pub fn encrypt_with_password(plaintext: &str, password: &str, salt: &[u8]) -> Result<String> {
    let mut key = derive_key(password, salt);
    let result = encrypt(plaintext, &key);
    key.zeroize();
    result
}

/// Decrypt `ciphertext` with a key derived from `password` and `salt`.
///
/// Fails the same way as [`decrypt`] when the password is wrong.
pub fn decrypt_with_password(ciphertext: &str, password: &str, salt: &[u8]) -> Result<String> {
    let mut key = derive_key(password, salt);
    let result = decrypt(ciphertext, &key);
    key.zeroize();
    result
}
