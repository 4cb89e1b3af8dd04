// Switchboard - Feature toggles for Rust
//
// This library decides whether named features are active by combining a
// master switch with pluggable activation strategies and fallback policies.

// Re-export core functionality
pub use switchboard_features::*;

// Re-export member crates
pub use switchboard_features;
pub use switchboard_log;

#[cfg(feature = "config")]
pub use switchboard_config;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        EvaluationContext,
        EvaluationOptions,
        FailureScope,
        Feature,
        FeatureError,
        FeatureService,
        InMemoryFeatureStore,
        NotFoundBehavior,
        OnErrorBehavior,
        RuntimeFeatureStore,
        Toggle,
        ToggleActivator,
        ToggleRegistry,
        ToggleResult,
        ToggleStrategy,
        ToggleType,
    };
    pub use tokio_util::sync::CancellationToken;
}
