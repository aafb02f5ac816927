//! Cryptographic primitives for CredVault.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption of single strings (`encryption`)
//! - PBKDF2-HMAC-SHA256 password-based key derivation (`kdf`)
//! - Best-effort wiping of sensitive buffers (`wipe`)

pub mod encryption;
pub mod kdf;
pub mod wipe;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_key, ...};
pub use encryption::{decrypt, decrypt_with_password, encrypt, encrypt_with_password};
pub use kdf::{derive_key, gen_salt, MasterKey, KEY_LEN, SALT_LEN};
pub use wipe::{wipe_bytes, wipe_map, wipe_string};
