//! Built-in toggle strategies.

mod environment;
mod from_to;
mod on_off;

pub use environment::EnvironmentVariableToggle;
pub use from_to::FromToToggle;
pub use on_off::{OffToggle, OnToggle};
