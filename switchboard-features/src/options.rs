//! Evaluation policies and store settings.
//!
//! Both are plain values handed to constructors; an engine never changes its
//! policies after it is built.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use switchboard_config::{ConfigError, ConfigService, ConfigValidator, DEFAULT_ENV_PREFIX, Validate};

/// What to report when a toggle or the store fails unexpectedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnErrorBehavior {
    /// Propagate the failure to the caller
    #[serde(alias = "Throw")]
    Throw,
    /// Treat the failure as active
    #[serde(alias = "SetEnabled")]
    SetEnabled,
    /// Treat the failure as inactive
    #[default]
    #[serde(alias = "SetDisabled")]
    SetDisabled,
}

impl OnErrorBehavior {
    /// Turn a failure into a boolean, or hand it back under `Throw`.
    pub fn apply<E>(self, failure: E) -> Result<bool, E> {
        match self {
            OnErrorBehavior::Throw => Err(failure),
            OnErrorBehavior::SetEnabled => Ok(true),
            OnErrorBehavior::SetDisabled => Ok(false),
        }
    }
}

impl FromStr for OnErrorBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "throw" => Ok(OnErrorBehavior::Throw),
            "setenabled" => Ok(OnErrorBehavior::SetEnabled),
            "setdisabled" => Ok(OnErrorBehavior::SetDisabled),
            _ => Err(format!("unknown on-error behavior '{}'", s)),
        }
    }
}

/// What to report when the requested feature does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundBehavior {
    #[serde(alias = "SetEnabled")]
    SetEnabled,
    #[default]
    #[serde(alias = "SetDisabled")]
    SetDisabled,
}

impl NotFoundBehavior {
    pub fn resolve(self) -> bool {
        matches!(self, NotFoundBehavior::SetEnabled)
    }
}

impl FromStr for NotFoundBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "setenabled" => Ok(NotFoundBehavior::SetEnabled),
            "setdisabled" => Ok(NotFoundBehavior::SetDisabled),
            _ => Err(format!("unknown not-found behavior '{}'", s)),
        }
    }
}

/// How far a substituted failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureScope {
    /// The substitute replaces only the failing toggle's result; remaining
    /// toggles are still combined with AND
    #[default]
    #[serde(alias = "Toggle")]
    Toggle,
    /// The substitute becomes the result of the whole evaluation
    #[serde(alias = "Feature")]
    Feature,
}

impl FromStr for FailureScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "toggle" => Ok(FailureScope::Toggle),
            "feature" => Ok(FailureScope::Feature),
            _ => Err(format!("unknown failure scope '{}'", s)),
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Policies applied by [`FeatureService`](crate::FeatureService).
///
/// ```
/// use switchboard_features::{EvaluationOptions, FailureScope, NotFoundBehavior, OnErrorBehavior};
///
/// let options = EvaluationOptions::new()
///     .with_on_error(OnErrorBehavior::Throw)
///     .with_not_found(NotFoundBehavior::SetEnabled)
///     .with_failure_scope(FailureScope::Feature);
///
/// assert_eq!(options.on_error, OnErrorBehavior::Throw);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvaluationOptions {
    #[serde(default, rename = "on_error_behavior")]
    pub on_error: OnErrorBehavior,

    #[serde(default, rename = "not_found_behavior")]
    pub not_found: NotFoundBehavior,

    #[serde(default)]
    pub failure_scope: FailureScope,
}

impl EvaluationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_error(mut self, behavior: OnErrorBehavior) -> Self {
        self.on_error = behavior;
        self
    }

    pub fn with_not_found(mut self, behavior: NotFoundBehavior) -> Self {
        self.not_found = behavior;
        self
    }

    pub fn with_failure_scope(mut self, scope: FailureScope) -> Self {
        self.failure_scope = scope;
        self
    }

    /// Read `on_error_behavior`, `not_found_behavior` and `failure_scope`,
    /// keeping defaults for absent keys.
    pub fn from_config(config: &ConfigService) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            on_error: read_enum(config, "on_error_behavior")?.unwrap_or(defaults.on_error),
            not_found: read_enum(config, "not_found_behavior")?.unwrap_or(defaults.not_found),
            failure_scope: read_enum(config, "failure_scope")?.unwrap_or(defaults.failure_scope),
        })
    }

    /// Read the options from `SWITCHBOARD_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = ConfigService::builder()
            .with_prefix(DEFAULT_ENV_PREFIX)
            .load_env()
            .build()?;
        Self::from_config(&config)
    }
}

fn read_enum<T>(config: &ConfigService, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr<Err = String>,
{
    config
        .get_opt::<String>(key)?
        .map(|raw| {
            raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: key.to_string(),
                message,
            })
        })
        .transpose()
}

/// Settings for [`CachedFeatureStore`](crate::CachedFeatureStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// How long a lookup result stays fresh
    pub ttl: Duration,

    /// Whether "feature absent" answers are cached too
    pub cache_misses: bool,

    /// Entries held before expired ones are swept and the oldest evicted
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            cache_misses: true,
            max_entries: 1000,
        }
    }
}

impl CacheSettings {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_cache_misses(mut self, cache_misses: bool) -> Self {
        self.cache_misses = cache_misses;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read `cache_ttl_secs`, `cache_misses` and `cache_max_entries`, then validate.
    pub fn from_config(config: &ConfigService) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = Self {
            ttl: config
                .get_opt::<u64>("cache_ttl_secs")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.ttl),
            cache_misses: config
                .get_opt("cache_misses")?
                .unwrap_or(defaults.cache_misses),
            max_entries: config
                .get_opt("cache_max_entries")?
                .unwrap_or(defaults.max_entries),
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for CacheSettings {
    fn validate(&self) -> switchboard_config::Result<()> {
        ConfigValidator::positive_duration(self.ttl, "cache_ttl_secs")?;
        ConfigValidator::positive(self.max_entries as u64, "cache_max_entries")
    }
}
