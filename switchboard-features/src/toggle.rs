//! Toggle strategy contract.
//!
//! A strategy implements one activation rule. The engine hands it an
//! [`EvaluationContext`] describing the feature being evaluated and the toggle
//! that selected this strategy; the strategy reads its parameters from there
//! and answers whether it is active.

use crate::error::{ToggleError, ToggleResult};
use crate::model::{Feature, Toggle, ToggleParameters};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One activation rule.
///
/// Implementations must be reentrant: the registry may hand the same instance
/// to concurrent evaluations. They must not mutate feature data (they only
/// ever see shared references).
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use switchboard_features::{EvaluationContext, ToggleResult, ToggleStrategy};
///
/// struct WeekendOnly;
///
/// #[async_trait]
/// impl ToggleStrategy for WeekendOnly {
///     async fn is_active(&self, ctx: &EvaluationContext<'_>) -> ToggleResult<bool> {
///         let days = ctx.parameters().get_list("Days", ';')?;
///         Ok(days.contains(&"sat") || days.contains(&"sun"))
///     }
/// }
/// ```
#[async_trait]
pub trait ToggleStrategy: Send + Sync {
    /// Decide whether this rule grants activation.
    ///
    /// Missing or malformed parameters are errors, not an inactive answer.
    async fn is_active(&self, ctx: &EvaluationContext<'_>) -> ToggleResult<bool>;
}

/// A strategy with a stable registry identity and published metadata.
pub trait ToggleType: ToggleStrategy + 'static {
    /// Registry key this strategy is known by
    const TYPE_NAME: &'static str;

    fn descriptor() -> ToggleDescriptor;
}

/// What a strategy sees while being evaluated.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    feature: &'a Feature,
    toggle: &'a Toggle,
    cancellation: &'a CancellationToken,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(feature: &'a Feature, toggle: &'a Toggle, cancellation: &'a CancellationToken) -> Self {
        Self {
            feature,
            toggle,
            cancellation,
        }
    }

    pub fn feature_name(&self) -> &'a str {
        self.feature.name()
    }

    pub fn product_name(&self) -> Option<&'a str> {
        self.feature.product_name()
    }

    /// The feature currently being evaluated.
    pub fn feature(&self) -> &'a Feature {
        self.feature
    }

    /// The toggle whose type selected this strategy.
    pub fn toggle(&self) -> &'a Toggle {
        self.toggle
    }

    /// Parameters of [`toggle`](Self::toggle).
    pub fn parameters(&self) -> &'a ToggleParameters {
        self.toggle.parameters()
    }

    /// Look up another toggle attached to the evaluating feature.
    pub fn find_toggle(&self, type_name: &str) -> ToggleResult<&'a Toggle> {
        self.feature
            .get_toggle(type_name)
            .ok_or_else(|| ToggleError::NotConfigured {
                feature: self.feature.name().to_string(),
                toggle_type: type_name.to_string(),
            })
    }

    pub fn cancellation(&self) -> &'a CancellationToken {
        self.cancellation
    }

    /// Fail with [`ToggleError::Cancelled`] if the caller has withdrawn.
    pub fn check_cancelled(&self) -> ToggleResult<()> {
        if self.cancellation.is_cancelled() {
            Err(ToggleError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Declared type of a toggle parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    String,
    Date,
    Integer,
    Boolean,
    SemicolonList,
}

/// A parameter a strategy reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterDescriptor {
    pub name: &'static str,
    pub kind: ParameterKind,
    pub description: &'static str,
}

impl ParameterDescriptor {
    pub const fn new(name: &'static str, kind: ParameterKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
        }
    }
}

/// Discovery metadata for a registered strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleDescriptor {
    pub type_name: String,
    pub description: String,
    pub parameters: Vec<ParameterDescriptor>,
}

impl ToggleDescriptor {
    pub fn new(type_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// Source of the current UTC time for time-based strategies.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

pub(crate) fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}
