use crate::error::ToggleResult;
use crate::toggle::{
    EvaluationContext, ParameterDescriptor, ParameterKind, ToggleDescriptor, ToggleStrategy,
    ToggleType,
};
use async_trait::async_trait;

/// Active when a process environment variable holds one of the listed values.
///
/// `Values` is `;`-separated and compared case-insensitively. An unset
/// variable is inactive.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentVariableToggle;

impl EnvironmentVariableToggle {
    pub const ENVIRONMENT_VARIABLE: &'static str = "EnvironmentVariable";
    pub const VALUES: &'static str = "Values";
}

#[async_trait]
impl ToggleStrategy for EnvironmentVariableToggle {
    async fn is_active(&self, ctx: &EvaluationContext<'_>) -> ToggleResult<bool> {
        let parameters = ctx.parameters();
        let variable = parameters.get_str(Self::ENVIRONMENT_VARIABLE)?;
        let values = parameters.get_list(Self::VALUES, ';')?;

        Ok(match std::env::var(variable) {
            Ok(current) => values.iter().any(|v| v.eq_ignore_ascii_case(current.trim())),
            Err(_) => false,
        })
    }
}

impl ToggleType for EnvironmentVariableToggle {
    const TYPE_NAME: &'static str = "environment_variable";

    fn descriptor() -> ToggleDescriptor {
        ToggleDescriptor::new(
            Self::TYPE_NAME,
            "Toggle that is active depending on the value of an environment variable.",
        )
        .with_parameter(ParameterDescriptor::new(
            Self::ENVIRONMENT_VARIABLE,
            ParameterKind::String,
            "The environment variable name.",
        ))
        .with_parameter(ParameterDescriptor::new(
            Self::VALUES,
            ParameterKind::SemicolonList,
            "The environment variable values to activate this toggle, separated by ';'.",
        ))
    }
}
