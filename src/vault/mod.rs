//! Vault module — encrypted secret storage.
//!
//! This module provides:
//! - The on-disk JSON document and its load/save logic (`format`)
//! - Advisory file locking and permission hardening (`lockfile`)
//! - Password strength validation (`password`)
//! - The high-level `VaultManager` for the password lifecycle, secret
//!   CRUD, and environment export (`manager`)

pub mod format;
pub mod lockfile;
pub mod manager;
pub mod password;

// Re-export the most commonly used items.
pub use format::SecretsStore;
pub use manager::VaultManager;
pub use password::validate_password;
