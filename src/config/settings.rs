use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};

/// Application-level configuration, loaded from `.credvault.toml`.
///
/// Every field has a sensible default so the vault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to the base dir) where the store file lives.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// File name of the JSON secrets store inside `data_dir`.
    #[serde(default = "default_secrets_file")]
    pub secrets_file: String,

    /// Environment variable consulted for an unattended vault password.
    #[serde(default = "default_vault_key_env")]
    pub vault_key_env: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_data_dir() -> String {
    ".credvault".to_string()
}

fn default_secrets_file() -> String {
    "secrets.json".to_string()
}

fn default_vault_key_env() -> String {
    "CREDVAULT_KEY".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            secrets_file: default_secrets_file(),
            vault_key_env: default_vault_key_env(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the base directory.
    const FILE_NAME: &'static str = ".credvault.toml";

    /// Load settings from `<base_dir>/.credvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let config_path = base_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Build the full path to the secrets store file.
    ///
    /// Example: `base_dir/.credvault/secrets.json`
    pub fn secrets_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.data_dir).join(&self.secrets_file)
    }

    /// Read the vault password from the configured environment
    /// variable, if set and non-empty. Lets scripted runs unlock the
    /// vault without an interactive prompt.
    pub fn vault_key_from_env(&self) -> Option<String> {
        std::env::var(&self.vault_key_env)
            .ok()
            .filter(|v| !v.is_empty())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
