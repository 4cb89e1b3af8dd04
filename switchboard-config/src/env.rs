// Environment variable loading

use crate::Result;
use std::collections::HashMap;
use std::env;

/// Environment variable loader
///
/// With a prefix, only `PREFIX_*` variables are collected and their keys are
/// stored lowercased without the prefix: `SWITCHBOARD_FAILURE_SCOPE` becomes
/// `failure_scope`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load all matching environment variables
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(env::vars()
            .filter_map(|(key, value)| self.strip(&key).map(|k| (k, value)))
            .collect())
    }

    fn strip(&self, key: &str) -> Option<String> {
        match self.prefix {
            Some(ref prefix) => key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|rest| !rest.is_empty())
                .map(str::to_lowercase),
            None => Some(key.to_lowercase()),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}
