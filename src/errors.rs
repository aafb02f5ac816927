use thiserror::Error;

/// All errors that can occur in CredVault.
///
/// The variants are deliberately fine-grained so the UI layer can tell
/// "wrong password" from "no such secret" from "store file is broken"
/// without string matching.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong password or corrupted data")]
    DecryptionFailed,

    // --- Password lifecycle errors ---
    #[error("Invalid password")]
    InvalidPassword,

    #[error("Weak password: {0}")]
    WeakPassword(String),

    #[error("No password has been set — nothing to verify against")]
    NoPassword,

    #[error("Vault is locked — unlock it first")]
    VaultLocked,

    // --- Secret errors ---
    #[error("Invalid secret name: {0}")]
    InvalidKey(String),

    #[error("No secret found for key: {0}")]
    SecretNotFound(String),

    // --- Store errors ---
    #[error("Secrets store is corrupted: {0}")]
    StoreCorrupted(String),

    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Convenience type alias for CredVault results.
pub type Result<T> = std::result::Result<T, VaultError>;
