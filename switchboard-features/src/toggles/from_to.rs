//! Time window strategy.

use crate::error::ToggleResult;
use crate::toggle::{
    Clock, EvaluationContext, ParameterDescriptor, ParameterKind, ToggleDescriptor,
    ToggleStrategy, ToggleType, system_clock,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Active strictly between the `From` and `To` UTC timestamps.
///
/// Both bounds use the `yyyy-MM-dd HH:mm:ss` layout. A `now` equal to either
/// bound is inactive. An unparsable bound is an error.
#[derive(Clone)]
pub struct FromToToggle {
    clock: Arc<dyn Clock>,
}

impl FromToToggle {
    pub const FROM: &'static str = "From";
    pub const TO: &'static str = "To";

    /// `chrono` layout of both bounds.
    pub const FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    /// Evaluate against the given clock instead of the wall clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for FromToToggle {
    fn default() -> Self {
        Self::with_clock(system_clock())
    }
}

impl std::fmt::Debug for FromToToggle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FromToToggle").finish_non_exhaustive()
    }
}

#[async_trait]
impl ToggleStrategy for FromToToggle {
    async fn is_active(&self, ctx: &EvaluationContext<'_>) -> ToggleResult<bool> {
        let parameters = ctx.parameters();
        let from = parameters.get_date(Self::FROM, Self::FORMAT)?;
        let to = parameters.get_date(Self::TO, Self::FORMAT)?;
        let now = self.clock.now_utc();

        Ok(from < now && now < to)
    }
}

impl ToggleType for FromToToggle {
    const TYPE_NAME: &'static str = "from_to";

    fn descriptor() -> ToggleDescriptor {
        ToggleDescriptor::new(
            Self::TYPE_NAME,
            "Toggle that is active depending on current UTC date.",
        )
        .with_parameter(ParameterDescriptor::new(
            Self::FROM,
            ParameterKind::Date,
            "The from date (yyyy-MM-dd HH:mm:ss) interval when this toggle is activated.",
        ))
        .with_parameter(ParameterDescriptor::new(
            Self::TO,
            ParameterKind::Date,
            "The to date (yyyy-MM-dd HH:mm:ss) interval when this toggle is activated.",
        ))
    }
}
