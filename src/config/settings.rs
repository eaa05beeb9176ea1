use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::DEFAULT_ITERATIONS;
use crate::errors::{LockboxError, Result};
use crate::strength::MIN_MASTER_PASSWORD_LEN;
use crate::vault::engine::{EngineConfig, DEFAULT_STORAGE_KEY};

/// Project-level configuration, loaded from `.lockbox.toml`.
///
/// Every field has a sensible default so Lockbox works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to project root) where the vault file is stored.
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,

    /// Store key of the vault record (file name without `.vault`).
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// PBKDF2 iterations for newly created vaults.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Minimum master password length enforced by `init`.
    #[serde(default = "default_min_master_password_len")]
    pub min_master_password_len: usize,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_dir() -> String {
    ".lockbox".to_string()
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_min_master_password_len() -> usize {
    MIN_MASTER_PASSWORD_LEN
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_dir: default_vault_dir(),
            storage_key: default_storage_key(),
            kdf_iterations: default_kdf_iterations(),
            min_master_password_len: default_min_master_password_len(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".lockbox.toml";

    /// Load settings from `<project_dir>/.lockbox.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            LockboxError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.kdf_iterations < 1 {
            return Err(LockboxError::ConfigError(
                "kdf_iterations must be at least 1".into(),
            ));
        }

        Ok(settings)
    }

    /// Full path of the vault directory.
    ///
    /// Example: `project_dir/.lockbox`
    pub fn vault_dir_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_dir)
    }

    /// Convert the settings into engine parameters.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            storage_key: self.storage_key.clone(),
            iterations: self.kdf_iterations,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
