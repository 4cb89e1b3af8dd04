//! Error types for feature evaluation.

use switchboard_config::ConfigError;
use thiserror::Error;

/// Result type for toggle parameter lookups.
pub type ParameterResult<T> = Result<T, ParameterError>;

/// Result type for toggle strategies.
pub type ToggleResult<T> = Result<T, ToggleError>;

/// Result type for runtime stores.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for the evaluation engine.
pub type FeatureResult<T> = Result<T, FeatureError>;

/// A toggle parameter could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    /// Parameter is not present on the toggle
    #[error("Missing parameter '{0}'")]
    Missing(String),

    /// Parameter is present but cannot be read as the requested type
    #[error("Invalid value '{value}' for parameter '{name}': {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

/// A toggle strategy failed to decide.
#[derive(Debug, Error)]
pub enum ToggleError {
    /// The evaluating feature carries no toggle of the requested type
    #[error("Toggle '{toggle_type}' is not configured on feature '{feature}'")]
    NotConfigured { feature: String, toggle_type: String },

    /// A declared parameter is missing or malformed
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// The strategy panicked while evaluating
    #[error("Toggle panicked: {0}")]
    Panicked(String),

    /// Strategy-specific failure
    #[error("Toggle evaluation failed: {0}")]
    Failed(String),

    /// The strategy observed the caller's cancellation
    #[error("Toggle evaluation cancelled")]
    Cancelled,
}

/// A runtime store could not answer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing storage is unreachable or erroring
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Feature definitions could not be loaded
    #[error("Failed to load features: {0}")]
    Load(String),

    /// Two definitions share the same product and name
    #[error("Duplicate feature '{name}' in product {product:?}")]
    DuplicateFeature {
        name: String,
        product: Option<String>,
    },

    /// Configuration error while building the store
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failure surfaced by the evaluation engine.
///
/// Store and toggle failures only reach the caller under
/// [`OnErrorBehavior::Throw`](crate::OnErrorBehavior::Throw). Cancellation is
/// always reported.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// The caller withdrew the evaluation
    #[error("Feature evaluation cancelled")]
    Cancelled,

    /// The runtime store failed
    #[error("Store failure while resolving feature '{feature}': {source}")]
    Store {
        feature: String,
        #[source]
        source: StoreError,
    },

    /// A toggle strategy failed
    #[error("Toggle '{toggle_type}' failed for feature '{feature}': {source}")]
    Toggle {
        feature: String,
        toggle_type: String,
        #[source]
        source: ToggleError,
    },
}

impl FeatureError {
    /// Whether this error is a cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FeatureError::Cancelled)
    }
}
