//! Feature evaluation for Switchboard
//!
//! Decides whether a named feature is active by combining the feature's
//! master switch with pluggable activation rules ("toggles").
//!
//! # Features
//!
//! - 🔌 **Pluggable toggles** - Strategies resolved by type name from a registry
//! - ⏱️ **Built-in strategies** - `on`, `off`, `from_to` and `environment_variable`
//! - 🛡️ **Fallback policies** - Configurable answers for missing features and failures
//! - 🗄️ **Stores** - In-memory and file-backed definitions with an optional TTL cache
//! - 🛑 **Cancellation** - Every evaluation honors a `CancellationToken`
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use switchboard_features::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryFeatureStore::new();
//! store
//!     .add(
//!         Feature::new("new-checkout")
//!             .with_product("shop")
//!             .enabled()
//!             .with_toggle(
//!                 Toggle::new("from_to")
//!                     .with_parameter("From", "2020-01-01 00:00:00")
//!                     .with_parameter("To", "2999-01-01 00:00:00"),
//!             ),
//!     )
//!     .await;
//!
//! let service = FeatureService::new(
//!     Arc::new(store),
//!     Arc::new(ToggleRegistry::with_defaults()),
//!     EvaluationOptions::default(),
//! );
//!
//! let token = CancellationToken::new();
//! if service.is_enabled("new-checkout", Some("shop"), &token).await.unwrap() {
//!     // Serve the new checkout
//! }
//! # });
//! ```
//!
//! # Custom Toggles
//!
//! ```
//! use async_trait::async_trait;
//! use switchboard_features::*;
//!
//! #[derive(Default)]
//! struct MinimumVersion;
//!
//! #[async_trait]
//! impl ToggleStrategy for MinimumVersion {
//!     async fn is_active(&self, ctx: &EvaluationContext<'_>) -> ToggleResult<bool> {
//!         Ok(ctx.parameters().get_int("Version")? >= 3)
//!     }
//! }
//!
//! impl ToggleType for MinimumVersion {
//!     const TYPE_NAME: &'static str = "minimum_version";
//!
//!     fn descriptor() -> ToggleDescriptor {
//!         ToggleDescriptor::new(Self::TYPE_NAME, "Active from a given version on")
//!     }
//! }
//!
//! let registry = ToggleRegistry::with_defaults();
//! registry.register::<MinimumVersion>();
//! assert!(registry.contains("minimum_version"));
//! ```
//!
//! # Policies
//!
//! ```
//! use switchboard_features::*;
//!
//! let options = EvaluationOptions::new()
//!     .with_on_error(OnErrorBehavior::Throw)
//!     .with_not_found(NotFoundBehavior::SetEnabled)
//!     .with_failure_scope(FailureScope::Toggle);
//! ```

pub mod activator;
pub mod error;
pub mod model;
pub mod options;
pub mod service;
pub mod store;
pub mod toggle;
pub mod toggles;

pub use activator::{ToggleActivator, ToggleFactory, ToggleRegistry};
pub use error::{
    FeatureError, FeatureResult, ParameterError, ParameterResult, StoreError, StoreResult,
    ToggleError, ToggleResult,
};
pub use model::{Feature, FeatureKey, Toggle, ToggleParameters};
pub use options::{
    CacheSettings, EvaluationOptions, FailureScope, NotFoundBehavior, OnErrorBehavior,
};
pub use service::{Cause, Evaluation, FeatureService, Reason};
pub use store::{CachedFeatureStore, FeatureCatalog, InMemoryFeatureStore, RuntimeFeatureStore};
pub use toggle::{
    Clock, EvaluationContext, FixedClock, ParameterDescriptor, ParameterKind, SystemClock,
    ToggleDescriptor, ToggleStrategy, ToggleType,
};
pub use toggles::{EnvironmentVariableToggle, FromToToggle, OffToggle, OnToggle};
