//! Switchboard Logging
//!
//! Structured logging for the Switchboard feature evaluation engine, driven by
//! `SWITCHBOARD_*` environment variables.
//!
//! # Features
//!
//! - **Environment-controlled**: `SWITCHBOARD_DEBUG=1` enables debug logging
//! - **Cheap when disabled**: macros check the global level before formatting
//! - **Key-value fields**: attach `feature`, `product`, `toggle` and friends
//!   to a record instead of baking them into the message
//! - **Multiple backends**: stderr output, optionally bridged into `tracing`
//!
//! # Usage
//!
//! ```rust
//! use switchboard_log::{debug, info, warn};
//!
//! debug!("Evaluating feature");
//! info!("Registered {} toggle types", 4);
//!
//! let feature = "new-checkout";
//! warn!("feature" = feature, "toggle" = "from_to"; "Toggle failed, substituting false");
//!
//! debug!(target: "switchboard::store", "Cache miss for {}", feature);
//! ```
//!
//! # Environment Variables
//!
//! - `SWITCHBOARD_DEBUG=1` - Enable debug logging
//! - `SWITCHBOARD_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `SWITCHBOARD_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `SWITCHBOARD_LOG_COLOR=1|0` - Enable/disable colors
//! - `SWITCHBOARD_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `SWITCHBOARD_LOG_MODULE=1|0` - Include the record target

use once_cell::sync::Lazy;
use std::env;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Log Levels
// ============================================================================

/// Log level for Switchboard logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
    /// Off (no logging)
    Off = 5,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Get level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }

    #[cfg(feature = "color")]
    fn colored(&self) -> colored::ColoredString {
        use colored::Colorize;
        match self {
            Level::Trace => "TRACE".magenta(),
            Level::Debug => "DEBUG".blue(),
            Level::Info => "INFO".green(),
            Level::Warn => "WARN".yellow(),
            Level::Error => "ERROR".red().bold(),
            Level::Off => "OFF".white(),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-field human readable line
    Pretty,
    /// Short single-line format
    Compact,
    /// One JSON object per line
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Global Configuration
// ============================================================================

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
    /// Whether to include timestamps
    pub timestamps: bool,
    /// Whether to include the record target
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false,
            timestamps: true,
            module_path: true,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl LogConfig {
    /// Build the configuration from `SWITCHBOARD_*` environment variables and
    /// publish the resulting level to the global atomics.
    pub fn from_env() -> Self {
        let debug = env_flag("SWITCHBOARD_DEBUG").unwrap_or(false);

        let level = env::var("SWITCHBOARD_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = env::var("SWITCHBOARD_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        let color = env_flag("SWITCHBOARD_LOG_COLOR").unwrap_or_else(stderr_supports_color);
        let timestamps = env_flag("SWITCHBOARD_LOG_TIMESTAMPS").unwrap_or(true);
        let module_path = env_flag("SWITCHBOARD_LOG_MODULE").unwrap_or(true);

        DEBUG_ENABLED.store(debug, Ordering::SeqCst);
        LOG_LEVEL.store(level as u8, Ordering::SeqCst);

        Self {
            debug,
            level,
            format,
            color,
            timestamps,
            module_path,
        }
    }
}

fn stderr_supports_color() -> bool {
    env::var("NO_COLOR").is_err() && env::var("TERM").is_ok()
}

// ============================================================================
// Public API
// ============================================================================

/// Initialize the logging system eagerly.
///
/// The first macro call initializes it lazily otherwise.
pub fn init() {
    Lazy::force(&CONFIG);
}

/// Check if debug logging is enabled.
#[inline]
pub fn is_debug_enabled() -> bool {
    Lazy::force(&CONFIG);
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Check if a log level is enabled.
#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    Lazy::force(&CONFIG);
    level != Level::Off && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Get current log level.
pub fn current_level() -> Level {
    Lazy::force(&CONFIG);
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Set log level at runtime.
pub fn set_level(level: Level) {
    Lazy::force(&CONFIG);
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Enable or disable debug mode at runtime.
pub fn set_debug(enabled: bool) {
    Lazy::force(&CONFIG);
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

/// Get the global configuration.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

// ============================================================================
// Log Output
// ============================================================================

/// Emit a record without fields.
#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    log_kv(level, target, &[], message);
}

/// Emit a record with key-value fields.
#[doc(hidden)]
pub fn log_kv(level: Level, target: &str, fields: &[(&str, String)], message: &str) {
    if !is_level_enabled(level) {
        return;
    }

    let line = render(config(), level, target, fields, message);
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", line);
}

fn render(
    config: &LogConfig,
    level: Level,
    target: &str,
    fields: &[(&str, String)],
    message: &str,
) -> String {
    match config.format {
        Format::Pretty => render_pretty(config, level, target, fields, message),
        Format::Compact => render_compact(config, level, target, fields, message),
        Format::Json => render_json(level, target, fields, message),
    }
}

fn render_pretty(
    config: &LogConfig,
    level: Level,
    target: &str,
    fields: &[(&str, String)],
    message: &str,
) -> String {
    let mut out = String::new();

    if config.timestamps {
        let now = chrono::Local::now();
        out.push_str(&format!("{} ", now.format("%Y-%m-%d %H:%M:%S%.3f")));
    }

    #[cfg(feature = "color")]
    if config.color {
        out.push_str(&format!("{:5} ", level.colored()));
    } else {
        out.push_str(&format!("{:5} ", level.as_str()));
    }
    #[cfg(not(feature = "color"))]
    out.push_str(&format!("{:5} ", level.as_str()));

    if config.module_path && !target.is_empty() {
        out.push_str(&format!("[{}] ", target));
    }

    out.push_str(message);
    for (key, value) in fields {
        out.push_str(&format!(" {}={}", key, value));
    }
    out
}

fn render_compact(
    config: &LogConfig,
    level: Level,
    target: &str,
    fields: &[(&str, String)],
    message: &str,
) -> String {
    let mut out = String::new();

    if config.timestamps {
        out.push_str(&chrono::Local::now().format("%H:%M:%S ").to_string());
    }

    out.push(level.as_str().chars().next().unwrap_or('?'));
    out.push(' ');

    if config.module_path && !target.is_empty() {
        out.push_str(target);
        out.push_str(": ");
    }

    out.push_str(message);
    for (key, value) in fields {
        out.push_str(&format!(" {}={}", key, value));
    }
    out
}

#[cfg(feature = "json")]
fn render_json(level: Level, target: &str, fields: &[(&str, String)], message: &str) -> String {
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Entry<'a> {
        timestamp: String,
        level: &'a str,
        target: &'a str,
        message: &'a str,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        fields: BTreeMap<&'a str, &'a str>,
    }

    let entry = Entry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: level.as_str(),
        target,
        message,
        fields: fields.iter().map(|(k, v)| (*k, v.as_str())).collect(),
    };

    serde_json::to_string(&entry).unwrap_or_else(|_| message.to_string())
}

#[cfg(not(feature = "json"))]
fn render_json(level: Level, target: &str, fields: &[(&str, String)], message: &str) -> String {
    let mut out = format!(
        r#"{{"timestamp":"{}","level":"{}","target":"{}","message":"{}""#,
        chrono::Utc::now().to_rfc3339(),
        level.as_str(),
        escape_json(target),
        escape_json(message)
    );
    if !fields.is_empty() {
        let rendered: Vec<String> = fields
            .iter()
            .map(|(k, v)| format!(r#""{}":"{}""#, escape_json(k), escape_json(v)))
            .collect();
        out.push_str(&format!(r#","fields":{{{}}}"#, rendered.join(",")));
    }
    out.push('}');
    out
}

#[cfg(not(feature = "json"))]
fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => result.push_str(&format!("\\u{:04x}", c as u32)),
            c => result.push(c),
        }
    }
    result
}

// ============================================================================
// Macros
// ============================================================================

/// Shared expansion for the level macros.
#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:expr, target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::log($level, $target, &format!($($arg)+));
        }
    };
    ($level:expr, $($key:literal = $value:expr),+ ; $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::log_kv(
                $level,
                module_path!(),
                &[$(($key, format!("{}", $value))),+],
                &format!($($arg)+),
            );
        }
    };
    ($level:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::log($level, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log a trace message.
///
/// Only emitted when `SWITCHBOARD_LOG_LEVEL=trace`.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Trace, $($arg)+) };
}

/// Log a debug message.
///
/// Emitted when `SWITCHBOARD_DEBUG=1` or `SWITCHBOARD_LOG_LEVEL=debug`.
///
/// ```rust
/// use switchboard_log::debug;
///
/// debug!("Evaluating feature");
/// debug!("feature" = "beta", "product" = "shop"; "Feature {} found", "beta");
/// debug!(target: "switchboard::activator", "Unknown toggle type {}", "geo");
/// ```
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Debug, $($arg)+) };
}

/// Log an info message.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Info, $($arg)+) };
}

/// Log a warning message.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Warn, $($arg)+) };
}

/// Log an error message.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Error, $($arg)+) };
}

// ============================================================================
// Tracing Integration
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! Bridge into `tracing`.
    //!
    //! Builds a subscriber whose filter defaults to the `SWITCHBOARD_LOG_LEVEL`
    //! level when `RUST_LOG` is not set.

    use super::*;

    /// Create a tracing subscriber that respects the Switchboard config.
    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let config = config();
        let level = match config.level {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(config.color))
    }
}

// ============================================================================
// Tests
// ============================================================================
