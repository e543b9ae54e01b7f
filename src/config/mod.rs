//! Persistent settings
//!
//! Stored as TOML at `<config dir>/diffdeck/config.toml`. Every section
//! falls back to its defaults, so older files keep loading after new keys
//! are added.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};
use crate::logging::LoggingConfig;
use crate::tab_manager::TabManagerConfig;
use crate::window_state::WindowGeometry;

/// Bounds for the progress log interval, in milliseconds
const MIN_PROGRESS_INTERVAL_MS: u64 = 100;
const MAX_PROGRESS_INTERVAL_MS: u64 = 60_000;

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Minimum spacing between logged progress lines
    pub progress_log_interval_ms: u64,
    pub logging: LoggingConfig,
    pub tabs: TabManagerConfig,
    pub window: WindowGeometry,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            progress_log_interval_ms: 1000,
            logging: LoggingConfig::default(),
            tabs: TabManagerConfig::default(),
            window: WindowGeometry::default(),
        }
    }
}

impl Settings {
    /// User settings path (~/.config/diffdeck/config.toml)
    pub fn config_path() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("diffdeck").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load the user settings, falling back to defaults on any problem
    pub fn load() -> Self {
        match Self::config_path() {
            Ok(path) => Self::load_or_default(&path),
            Err(e) => {
                tracing::error!(error = %e, "Failed to get config path, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`, falling back to defaults
    ///
    /// An unparseable file is renamed to `config.toml.backup` so the next
    /// save does not destroy it.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from_file(path) {
            Ok(settings) => {
                tracing::info!(path = %path.display(), "Loaded settings");
                settings
            }
            Err(ConfigError::FileNotFound { .. }) => {
                tracing::info!(path = %path.display(), "No settings file, using defaults");
                Self::default()
            }
            Err(ConfigError::ParseError(reason)) => {
                tracing::warn!(
                    path = %path.display(),
                    %reason,
                    "Failed to parse settings; using defaults and backing up old file"
                );
                let backup_path = path.with_extension("toml.backup");
                match fs::rename(path, &backup_path) {
                    Ok(()) => {
                        tracing::info!(backup = %backup_path.display(), "Backed up corrupted settings")
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to back up corrupted settings"),
                }
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read settings, using defaults");
                Self::default()
            }
        }
    }

    /// Load from a specific file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = fs::read_to_string(path)?;
        let mut settings: Settings = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;
        settings.validate();
        Ok(settings)
    }

    /// Save to the user settings path
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        fs::write(path, text)?;
        tracing::debug!(path = %path.display(), "Saved settings");
        Ok(())
    }

    /// Clamp values to sane ranges
    pub fn validate(&mut self) {
        self.progress_log_interval_ms = self
            .progress_log_interval_ms
            .clamp(MIN_PROGRESS_INTERVAL_MS, MAX_PROGRESS_INTERVAL_MS);
    }

    pub fn progress_interval(&self) -> chrono::Duration {
        let ms = i64::try_from(self.progress_log_interval_ms).unwrap_or(i64::MAX);
        chrono::Duration::milliseconds(ms)
    }
}
