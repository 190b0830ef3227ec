//! Project settings with persistence
//!
//! Settings are saved to `~/.config/colourbake/settings.toml` unless an
//! explicit path is given on the command line.

use std::fs;
use std::path::{Path, PathBuf};

use colourbake_assets::ImportSettings;
use colourbake_core::StrategyRegistry;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// All project settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    pub import: ImportSettings,
    /// Named colour strategies usable by `set-colour --strategy`.
    pub strategies: StrategyRegistry,
}

impl ProjectSettings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("colourbake"))
    }

    /// The file settings are read from and written to.
    pub fn settings_path(explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_dir().map(|p| p.join("settings.toml")),
        }
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load(explicit: Option<&Path>) -> Self {
        let Some(path) = Self::settings_path(explicit) else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self, explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
        let Some(path) = Self::settings_path(explicit) else {
            anyhow::bail!("Could not determine config directory");
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        info!("Saved settings to {:?}", path);
        Ok(path)
    }
}
