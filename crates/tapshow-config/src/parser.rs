//! KDL configuration parser

use std::path::Path;

use crate::error::ConfigError;
use crate::model::*;

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Load configuration, falling back to defaults when the file does not exist
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config_str(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No configuration at {}, using defaults",
                path.display()
            );
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl reports spans with its own miette version
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node, content)?;
            }
            "display" => {
                config.display = parse_display(node, content)?;
            }
            "behavior" => {
                config.behavior = parse_behavior(node, content)?;
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    Ok(config)
}

fn parse_global(node: &kdl::KdlNode, source: &str) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    let val = string_value(child, source)?;
                    global.log_level = val
                        .parse()
                        .map_err(|e| ConfigError::Invalid { message: e })?;
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_display(node: &kdl::KdlNode, source: &str) -> Result<DisplayConfig, ConfigError> {
    let mut display = DisplayConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "show-held-keys" => display.show_held_keys = bool_value(child, source)?,
                "held-key-timeout-ms" => display.held_key_timeout_ms = u64_value(child, source)?,
                "history-count" => {
                    let count = u64_value(child, source)?;
                    display.history_count =
                        usize::try_from(count).map_err(|_| ConfigError::Invalid {
                            message: format!("history-count {} is too large", count),
                        })?;
                }
                name => {
                    tracing::warn!("Unknown display config option: {}", name);
                }
            }
        }
    }

    Ok(display)
}

fn parse_behavior(node: &kdl::KdlNode, source: &str) -> Result<BehaviorConfig, ConfigError> {
    let mut behavior = BehaviorConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "combine-modifiers" => behavior.combine_modifiers = bool_value(child, source)?,
                "show-modifier-only" => behavior.show_modifier_only = bool_value(child, source)?,
                "excluded-keys" => behavior.excluded_keys = parse_excluded_keys(child, source)?,
                name => {
                    tracing::warn!("Unknown behavior config option: {}", name);
                }
            }
        }
    }

    Ok(behavior)
}

/// `excluded-keys "CapsLock" "Ctrl+Shift+S"`
///
/// Entries are kept as written; the daemon normalizes them before matching.
fn parse_excluded_keys(node: &kdl::KdlNode, source: &str) -> Result<Vec<String>, ConfigError> {
    let mut keys = Vec::with_capacity(node.entries().len());

    for entry in node.entries() {
        let Some(key) = entry.value().as_string() else {
            return Err(wrong_type(node, entry, "a key name or combo string", source));
        };
        if key.split('+').any(|part| part.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "excluded-keys entry \"{}\" has an empty key name. \
                     Use names like \"CapsLock\" or \"Ctrl+Shift+S\".",
                    key
                ),
            });
        }
        keys.push(key.to_string());
    }

    Ok(keys)
}

fn first_entry<'a>(node: &'a kdl::KdlNode) -> Result<&'a kdl::KdlEntry, ConfigError> {
    node.entries().first().ok_or_else(|| ConfigError::Invalid {
        message: format!("`{}` requires a value", node.name().value()),
    })
}

fn string_value<'a>(node: &'a kdl::KdlNode, source: &str) -> Result<&'a str, ConfigError> {
    let entry = first_entry(node)?;
    entry
        .value()
        .as_string()
        .ok_or_else(|| wrong_type(node, entry, "a string", source))
}

fn bool_value(node: &kdl::KdlNode, source: &str) -> Result<bool, ConfigError> {
    let entry = first_entry(node)?;
    entry
        .value()
        .as_bool()
        .ok_or_else(|| wrong_type(node, entry, "true or false", source))
}

fn u64_value(node: &kdl::KdlNode, source: &str) -> Result<u64, ConfigError> {
    let entry = first_entry(node)?;
    let value = entry
        .value()
        .as_i64()
        .ok_or_else(|| wrong_type(node, entry, "an integer", source))?;

    u64::try_from(value).map_err(|_| ConfigError::Invalid {
        message: format!(
            "`{}` must not be negative (got {})",
            node.name().value(),
            value
        ),
    })
}

fn wrong_type(
    node: &kdl::KdlNode,
    entry: &kdl::KdlEntry,
    expected: &'static str,
    source: &str,
) -> ConfigError {
    let span = entry.span();
    ConfigError::WrongType {
        option: node.name().value().to_string(),
        expected,
        src: source.to_string(),
        span: miette::SourceSpan::from((span.offset(), span.len())),
    }
}
