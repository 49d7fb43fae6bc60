//! Configuration loader.
//!
//! Reads `config.toml` from the txrule base directory (`~/.txrule` unless told
//! otherwise), expands `~` in paths, and falls back to defaults when no file
//! exists.
//!
//! ```no_run
//! use txrule_core::config_loader::ConfigLoader;
//!
//! let loader = ConfigLoader::new().expect("failed to create loader");
//! let config = loader.load().expect("failed to load config");
//! println!("{} EVM chains configured", config.evm_chains.len());
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::ConfigError;

/// The default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// The default base directory name within the home directory.
const BASE_DIR_NAME: &str = ".txrule";

/// Loads and writes the configuration file.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Base directory for txrule files (default: ~/.txrule).
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a loader rooted at `~/.txrule`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDirectory`] if the home directory cannot be determined.
    pub fn new() -> Result<Self, ConfigError> {
        let base_dir = default_base_dir()?;
        Ok(Self { base_dir })
    }

    /// Creates a loader rooted at `base_dir`.
    #[must_use]
    pub const fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Returns the path to the configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    /// Returns the base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Loads and validates the configuration, using defaults if the file
    /// doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseFailed`] if the file contains invalid TOML,
    /// [`ConfigError::Io`] on read failure, and any [`Config::validate`] error.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let config_path = self.config_path();

        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }

        load_from_path(&config_path)
    }

    /// Writes the default configuration file, creating the base directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if there's an I/O error writing the file.
    pub fn write_default(&self) -> Result<(), ConfigError> {
        if !self.base_dir.exists() {
            fs::create_dir_all(&self.base_dir).map_err(|e| {
                ConfigError::io(
                    format!("failed to create base directory {}", self.base_dir.display()),
                    e,
                )
            })?;
        }

        let config_path = self.config_path();
        fs::write(&config_path, Config::default_toml()).map_err(|e| {
            ConfigError::io(
                format!(
                    "failed to write default configuration to {}",
                    config_path.display()
                ),
                e,
            )
        })
    }

    /// Checks if the configuration file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.config_path().exists()
    }
}

/// Loads and validates a configuration file at an explicit path.
///
/// # Errors
///
/// Returns [`ConfigError::FileNotFound`] if `path` does not exist, otherwise
/// as [`ConfigLoader::load`].
pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::file_not_found(path.display().to_string()));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::io(format!("failed to read {}", path.display()), e))?;

    let config: Config = toml::from_str(&content).map_err(|e| {
        ConfigError::parse_failed(format!("invalid TOML in {}: {e}", path.display()))
    })?;

    config.validate()?;
    Ok(config)
}

/// Reads an auxiliary file (ABI, IDL, token list) named in the configuration.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] for an unexpandable `~` and
/// [`ConfigError::Io`] on read failure.
pub fn read_asset(path: &str) -> Result<String, ConfigError> {
    let expanded = expand_path(path)?;
    fs::read_to_string(&expanded)
        .map_err(|e| ConfigError::io(format!("failed to read {}", expanded.display()), e))
}

/// Expands a leading `~` to the home directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the path starts with `~` and
/// the home directory cannot be determined.
pub fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(ConfigError::no_home_directory)?;
        Ok(home.join(rest))
    } else if path == "~" {
        dirs::home_dir().ok_or_else(ConfigError::no_home_directory)
    } else {
        Ok(PathBuf::from(path))
    }
}

/// Returns the default base directory (`~/.txrule`).
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the home directory cannot be determined.
pub fn default_base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(ConfigError::no_home_directory)?;
    Ok(home.join(BASE_DIR_NAME))
}
