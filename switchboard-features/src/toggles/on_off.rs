use crate::error::ToggleResult;
use crate::toggle::{EvaluationContext, ToggleDescriptor, ToggleStrategy, ToggleType};
use async_trait::async_trait;

/// Always active.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnToggle;

#[async_trait]
impl ToggleStrategy for OnToggle {
    async fn is_active(&self, _ctx: &EvaluationContext<'_>) -> ToggleResult<bool> {
        Ok(true)
    }
}

impl ToggleType for OnToggle {
    const TYPE_NAME: &'static str = "on";

    fn descriptor() -> ToggleDescriptor {
        ToggleDescriptor::new(Self::TYPE_NAME, "Toggle that is always active.")
    }
}

/// Never active.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffToggle;

#[async_trait]
impl ToggleStrategy for OffToggle {
    async fn is_active(&self, _ctx: &EvaluationContext<'_>) -> ToggleResult<bool> {
        Ok(false)
    }
}

impl ToggleType for OffToggle {
    const TYPE_NAME: &'static str = "off";

    fn descriptor() -> ToggleDescriptor {
        ToggleDescriptor::new(Self::TYPE_NAME, "Toggle that is never active.")
    }
}
