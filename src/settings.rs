//! Configuration management for the GJF editor.
//!
//! Settings are read from INI-format `gjfed.cfg` files with hierarchical
//! precedence:
//!
//! 1. Local configuration (`./gjfed.cfg`)
//! 2. User configuration (`~/.config/gjfed/gjfed.cfg`)
//! 3. System configuration (`/etc/gjfed/gjfed.cfg`)
//! 4. Built-in defaults
//!
//! # Configuration File Format
//!
//! ```ini
//! [backup]
//! directory = backups
//! keep_last_n = 10
//!
//! [data]
//! keywords_dir =
//!
//! [logging]
//! level = info
//! ```
//!
//! An empty `keywords_dir` means the taxonomy embedded in the binary is
//! used; a non-empty value names a directory containing `keywords.json`.

use configparser::ini::Ini;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// All editor settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Backup subsystem settings
    pub backup: BackupSettings,
    /// Keyword data location settings
    pub data: DataSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Backup subsystem settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Directory backups are written to (default: "backups")
    pub directory: String,
    /// How many backups to keep when pruning (default: 10)
    pub keep_last_n: usize,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            directory: "backups".to_string(),
            keep_last_n: 10,
        }
    }
}

/// Keyword data location settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataSettings {
    /// Directory containing `keywords.json`; empty means the embedded
    /// taxonomy is used (default: empty)
    pub keywords_dir: String,
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (default: "info")
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Loads and hands out editor settings.
#[derive(Debug)]
pub struct SettingsManager {
    settings: Settings,
    config_source: String,
}

impl SettingsManager {
    /// Loads configuration from the available `gjfed.cfg` files, local
    /// overriding user overriding system overriding built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        let mut config_source = "built-in defaults".to_string();

        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(system_path) = Self::system_config_path() {
            candidates.push(system_path);
        }
        if let Some(user_path) = Self::user_config_path() {
            candidates.push(user_path);
        }
        candidates.push(PathBuf::from("gjfed.cfg"));

        for path in candidates {
            if !path.exists() {
                continue;
            }
            // Apply to a copy so a file that fails to parse leaves the
            // already-layered settings untouched.
            let mut layered = settings.clone();
            match Self::load_config_into(&path, &mut layered) {
                Ok(()) => {
                    settings = layered;
                    config_source = path.display().to_string();
                    debug!("Loaded configuration from: {}", path.display());
                }
                Err(e) => {
                    warn!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }

        Ok(Self {
            settings,
            config_source,
        })
    }

    /// Loads configuration from one explicit file, over the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        Self::load_config_into(path, &mut settings)?;
        Ok(Self {
            settings,
            config_source: path.display().to_string(),
        })
    }

    /// Returns the source of the loaded configuration.
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Gets a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets the backup settings.
    pub fn backup(&self) -> &BackupSettings {
        &self.settings.backup
    }

    /// Gets the data settings.
    pub fn data(&self) -> &DataSettings {
        &self.settings.data
    }

    /// Gets the logging settings.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    /// Applies one INI file onto `settings`.
    ///
    /// Only keys actually present in the file overwrite the current values,
    /// so an explicit setting in a higher-precedence file always wins, even
    /// when it equals a type's "empty" value (e.g. `keep_last_n = 0`).
    fn load_config_into(path: &Path, settings: &mut Settings) -> Result<(), ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut ini = Ini::new();
        ini.read(content)
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;

        if let Some(backup_map) = ini.get_map_ref().get("backup") {
            Self::apply_backup(backup_map, &mut settings.backup)?;
        }
        if let Some(data_map) = ini.get_map_ref().get("data") {
            Self::apply_data(data_map, &mut settings.data);
        }
        if let Some(logging_map) = ini.get_map_ref().get("logging") {
            Self::apply_logging(logging_map, &mut settings.logging);
        }

        Ok(())
    }

    fn apply_backup(
        section: &HashMap<String, Option<String>>,
        backup: &mut BackupSettings,
    ) -> Result<(), ConfigError> {
        if let Some(Some(directory)) = section.get("directory") {
            backup.directory = directory.clone();
        }
        if let Some(Some(keep_last_n)) = section.get("keep_last_n") {
            backup.keep_last_n = keep_last_n.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("Invalid keep_last_n: {}", keep_last_n))
            })?;
        }
        Ok(())
    }

    fn apply_data(section: &HashMap<String, Option<String>>, data: &mut DataSettings) {
        if let Some(Some(keywords_dir)) = section.get("keywords_dir") {
            data.keywords_dir = keywords_dir.clone();
        }
    }

    fn apply_logging(section: &HashMap<String, Option<String>>, logging: &mut LoggingSettings) {
        if let Some(Some(level)) = section.get("level") {
            logging.level = level.clone();
        }
    }

    fn system_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(PathBuf::from("/etc/gjfed/gjfed.cfg"))
        }
        #[cfg(windows)]
        {
            std::env::var("PROGRAMDATA")
                .ok()
                .map(|pd| PathBuf::from(pd).join("gjfed").join("gjfed.cfg"))
        }
    }

    fn user_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("gjfed")
                    .join("gjfed.cfg")
            })
        }
        #[cfg(windows)]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|appdata| PathBuf::from(appdata).join("gjfed").join("gjfed.cfg"))
        }
    }

    /// Writes a commented template configuration file.
    pub fn create_template(path: &Path) -> Result<(), ConfigError> {
        let defaults = Settings::default();
        let content = format!(
            r#"# GJF Editor configuration file
#
# Configuration files are loaded in hierarchical order with local settings
# taking precedence:
#
# 1. Current working directory (./gjfed.cfg) - highest priority
# 2. User config directory (~/.config/gjfed/gjfed.cfg)
# 3. System config directory (/etc/gjfed/gjfed.cfg)
# 4. Built-in defaults
#
# Missing sections or values fall back to the defaults shown below.

[backup]
# Directory edited files are backed up into before saving (default: backups)
directory = {}

# How many backups to keep when pruning with `gjfed backups --cleanup`
# (default: 10)
keep_last_n = {}

[data]
# Directory containing keywords.json. Leave empty to use the keyword
# taxonomy embedded in the binary.
keywords_dir = {}

[logging]
# Log level: debug, info, warn, error (default: info)
level = {}
"#,
            defaults.backup.directory,
            defaults.backup.keep_last_n,
            defaults.data.keywords_dir,
            defaults.logging.level,
        );

        fs::write(path, content)?;
        Ok(())
    }
}
