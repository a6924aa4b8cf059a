//! Configuration loading utilities
//!
//! Provides helper functions for loading configuration from various sources
//! with proper error handling and validation.

use crate::{Result, config::Settings};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File names probed when no configuration file is given explicitly
pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["config.toml", "config.json"];

/// Configuration loader with multiple source support
#[derive(Debug)]
pub struct ConfigLoader {
    /// Default settings
    defaults: Settings,
}

impl ConfigLoader {
    /// Create new configuration loader
    pub fn new() -> Self {
        Self {
            defaults: Settings::default(),
        }
    }

    /// Load configuration with precedence order:
    /// 1. Environment variables (highest priority)
    /// 2. Configuration file
    /// 3. Default values (lowest priority)
    ///
    /// An explicitly given file must exist; without one the working directory
    /// and the user config directory are searched.
    pub fn load(&self, config_file: Option<&Path>) -> Result<Settings> {
        let mut settings = self.defaults.clone();

        match config_file {
            Some(path) if path.exists() => {
                info!("Loading configuration from file: {:?}", path);
                settings = Settings::from_file(path)?;
            }
            Some(path) => {
                return Err(crate::Error::config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            None => match Self::discover() {
                Some(path) => {
                    info!("Loading configuration from file: {:?}", path);
                    settings = Settings::from_file(&path)?;
                }
                None => warn!("No configuration file found, using defaults and environment"),
            },
        }

        debug!("Applying environment variable overrides");
        settings = settings.merge_with_env()?;

        settings.validate()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:?}", settings);

        Ok(settings)
    }

    /// Get default configuration
    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    /// First existing default config file in the working directory, then in
    /// the user config directory
    fn discover() -> Option<PathBuf> {
        let user_dir = dirs::config_dir().map(|dir| dir.join("qr-checkin"));

        DEFAULT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .chain(
                user_dir
                    .into_iter()
                    .flat_map(|dir| DEFAULT_CONFIG_FILES.iter().map(move |name| dir.join(name))),
            )
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
