//! CredVault — a password-protected encrypted secrets vault.
//!
//! Secrets live in a JSON document on disk. Each value is encrypted with
//! AES-256-GCM under a key derived from the vault password via
//! PBKDF2-HMAC-SHA256, and a per-secret export flag controls whether
//! [`vault::VaultManager::import_to_env`] copies the decrypted value into
//! the process environment.
//!
//! The composing application owns a single [`vault::VaultManager`] and
//! translates its errors into notifications; this crate never renders UI.

pub mod config;
pub mod crypto;
pub mod errors;
pub mod vault;

pub use config::Settings;
pub use errors::{Result, VaultError};
pub use vault::VaultManager;
