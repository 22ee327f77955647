//! Sweep settings.
//!
//! Settings are persisted to `~/.config/mailreap/settings.json` (or the
//! platform equivalent) and loaded at startup. A missing file means defaults.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AccountId, ProviderType};

/// Errors that can occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No configuration directory available")]
    NoConfigDir,
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Account whose credentials are looked up in the keychain.
    pub account_id: AccountId,
    /// Mailbox provider to sweep.
    pub provider: ProviderType,
    /// Mailbox snapshot read by the memory provider.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            account_id: AccountId::from("default"),
            provider: ProviderType::Gmail,
            snapshot_path: None,
        }
    }
}

impl Settings {
    /// File name inside the configuration directory.
    pub const FILE_NAME: &'static str = "settings.json";

    /// Returns the platform settings path.
    pub fn default_path() -> Result<PathBuf> {
        ProjectDirs::from("io", "mailreap", "mailreap")
            .map(|dirs| dirs.config_dir().join(Self::FILE_NAME))
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Loads settings from `path`, falling back to defaults if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Writes settings to `path`, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
