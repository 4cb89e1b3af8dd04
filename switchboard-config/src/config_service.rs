// ConfigService - High-level configuration service

use crate::{ConfigManager, FileFormat, Result};
use serde::de::DeserializeOwned;

/// High-level configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    manager: ConfigManager,
}

impl ConfigService {
    /// Create an empty configuration service
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from an existing manager
    pub fn from_manager(manager: ConfigManager) -> Self {
        Self { manager }
    }

    /// Builder for creating configured service
    pub fn builder() -> ConfigServiceBuilder {
        ConfigServiceBuilder::new()
    }

    /// Get configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.manager.get(key)
    }

    /// Get configuration value, `None` when absent
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.manager.get_opt(key)
    }

    /// Get configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.manager.get_or(key, default)
    }

    /// Check if key exists
    pub fn has(&self, key: &str) -> bool {
        self.manager.has(key)
    }

    /// Get underlying manager
    pub fn manager(&self) -> &ConfigManager {
        &self.manager
    }
}

/// Builder for ConfigService
///
/// Sources are applied in a fixed order, later ones overriding earlier ones:
/// `.env` file, process environment, then each file in the order added.
#[derive(Default)]
pub struct ConfigServiceBuilder {
    manager: ConfigManager,
    load_env: bool,
    load_dotenv: bool,
    dotenv_path: Option<String>,
    config_files: Vec<(String, Option<FileFormat>)>,
}

impl ConfigServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set environment variable prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.manager = ConfigManager::with_prefix(prefix);
        self
    }

    /// Enable loading from environment variables
    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Enable loading from .env file
    pub fn load_dotenv(mut self, path: Option<String>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    /// Add configuration file with an explicit format
    pub fn add_file(mut self, path: impl Into<String>, format: FileFormat) -> Self {
        self.config_files.push((path.into(), Some(format)));
        self
    }

    /// Add configuration file, detecting the format from its extension
    pub fn add_file_auto(mut self, path: impl Into<String>) -> Self {
        self.config_files.push((path.into(), None));
        self
    }

    /// Build the configuration service
    pub fn build(self) -> Result<ConfigService> {
        if self.load_dotenv {
            // only the default .env may be absent
            self.manager.load_dotenv(self.dotenv_path.as_deref())?;
        }

        if self.load_env {
            self.manager.load_env()?;
        }

        for (path, format) in self.config_files {
            let format = match format {
                Some(format) => format,
                None => FileFormat::detect(&path)?,
            };
            self.manager.load_file(&path, format)?;
        }

        Ok(ConfigService::from_manager(self.manager))
    }
}
