//! Configuration data model

use std::path::PathBuf;
use std::time::Duration;

/// Default location of the configuration file, before tilde expansion
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/tapshow/config.kdl";

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    shellexpand::tilde(path).into_owned().into()
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub global: GlobalConfig,
    pub display: DisplayConfig,
    pub behavior: BehaviorConfig,
}

/// Global settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// How and for how long keystrokes are presented
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Emit a "(held)" event when a key stays down past the timeout
    pub show_held_keys: bool,
    /// Debounce interval before a pressed key counts as held
    pub held_key_timeout_ms: u64,
    /// Number of recent keystrokes kept in the history
    pub history_count: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_held_keys: true,
            held_key_timeout_ms: 500,
            history_count: 4,
        }
    }
}

impl DisplayConfig {
    pub fn held_key_timeout(&self) -> Duration {
        Duration::from_millis(self.held_key_timeout_ms)
    }
}

/// Rules for turning key events into display text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorConfig {
    /// Render held modifiers together with the key, e.g. `Ctrl+A`
    pub combine_modifiers: bool,
    /// Emit an event when a modifier is pressed on its own
    pub show_modifier_only: bool,
    /// Keys or `+`-joined combos that are never shown
    pub excluded_keys: Vec<String>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            combine_modifiers: true,
            show_modifier_only: false,
            excluded_keys: Vec::new(),
        }
    }
}
