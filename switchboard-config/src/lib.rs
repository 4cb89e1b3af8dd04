//! Configuration management for Switchboard
//!
//! Collects settings from environment variables, `.env` files and JSON/TOML
//! files into a single key/value map, then hands out typed values.
//!
//! ```
//! use switchboard_config::ConfigManager;
//!
//! let manager = ConfigManager::new();
//! manager.set("on_error_behavior", "set_disabled").unwrap();
//! manager.set("cache_ttl_secs", "45").unwrap();
//!
//! let ttl: u64 = manager.get("cache_ttl_secs").unwrap();
//! assert_eq!(ttl, 45);
//! ```

pub mod config_service;
pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use config_service::{ConfigService, ConfigServiceBuilder};
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Environment prefix used by Switchboard settings, e.g. `SWITCHBOARD_FAILURE_SCOPE`.
pub const DEFAULT_ENV_PREFIX: &str = "SWITCHBOARD";

/// Main configuration manager
///
/// Cloning is cheap; clones share the same underlying map.
#[derive(Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::default(),
            env_prefix: Some(prefix.into()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Value>>> {
        self.config.read().map_err(|_| ConfigError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Value>>> {
        self.config.write().map_err(|_| ConfigError::LockPoisoned)
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;

        let mut config = self.write()?;
        for (key, value) in env_vars {
            config.insert(key, Value::String(value));
        }

        Ok(())
    }

    /// Load configuration from a `.env` file, then from the environment
    pub fn load_dotenv(&self, path: Option<&str>) -> Result<()> {
        if let Some(path) = path {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        } else {
            dotenvy::dotenv().ok();
        }
        self.load_env()
    }

    /// Load configuration from file; top-level keys overwrite existing ones
    pub fn load_file(&self, path: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(data)
    }

    /// Merge a JSON object's top-level keys into this manager
    pub fn merge_value(&self, data: Value) -> Result<()> {
        let Value::Object(map) = data else {
            return Err(ConfigError::ParseError(
                "configuration root must be an object".to_string(),
            ));
        };

        let mut config = self.write()?;
        config.extend(map);
        Ok(())
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        self.write()?.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Get a configuration value
    ///
    /// Values that arrived as text (environment, `.env`) are re-read as JSON
    /// when they do not deserialize directly, so `"30"` satisfies a `u64`
    /// and `"true"` a `bool`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .read()?
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        coerce(key, value)
    }

    /// Get an optional configuration value; absent keys yield `Ok(None)`
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(ConfigError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        self.read().map(|c| c.contains_key(key)).unwrap_or(false)
    }

    /// Get all configuration keys
    pub fn keys(&self) -> Vec<String> {
        self.read()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn coerce<T: DeserializeOwned>(key: &str, value: Value) -> Result<T> {
    let direct_error = match serde_json::from_value::<T>(value.clone()) {
        Ok(typed) => return Ok(typed),
        Err(e) => e,
    };

    if let Value::String(text) = &value
        && let Ok(reparsed) = serde_json::from_str::<Value>(text)
        && let Ok(typed) = serde_json::from_value::<T>(reparsed)
    {
        return Ok(typed);
    }

    Err(ConfigError::InvalidValue {
        key: key.to_string(),
        message: direct_error.to_string(),
    })
}
