//! Render and write tapshow KDL configuration files

use std::path::Path;

use crate::error::ConfigError;
use crate::model::Config;

/// Render a configuration as a commented KDL document.
///
/// The output round-trips through [`crate::parse_config_str`] to an equal
/// [`Config`].
pub fn generate_config(config: &Config) -> String {
    let mut output = String::new();

    output.push_str("// tapshow configuration\n");
    output.push_str("// Run `tapshow validate` after editing this file.\n\n");

    output.push_str("global {\n");
    output.push_str("    // trace, debug, info, warn or error (RUST_LOG overrides this)\n");
    output.push_str(&format!(
        "    log-level \"{}\"\n",
        config.global.log_level.as_filter()
    ));
    output.push_str("}\n\n");

    output.push_str("display {\n");
    output.push_str("    // Show \"<key> (held)\" when a key stays down past the timeout\n");
    output.push_str(&format!(
        "    show-held-keys {}\n",
        config.display.show_held_keys
    ));
    output.push_str(&format!(
        "    held-key-timeout-ms {}\n",
        config.display.held_key_timeout_ms
    ));
    output.push_str("    // Number of recent keystrokes kept on screen\n");
    output.push_str(&format!(
        "    history-count {}\n",
        config.display.history_count
    ));
    output.push_str("}\n\n");

    output.push_str("behavior {\n");
    output.push_str(&format!(
        "    combine-modifiers {}\n",
        config.behavior.combine_modifiers
    ));
    output.push_str(&format!(
        "    show-modifier-only {}\n",
        config.behavior.show_modifier_only
    ));
    output.push_str("    // Keys or combos never shown, matched ignoring case, order and spaces\n");
    if config.behavior.excluded_keys.is_empty() {
        output.push_str("    // excluded-keys \"CapsLock\" \"Ctrl+Shift+S\"\n");
    } else {
        output.push_str("    excluded-keys");
        for key in &config.behavior.excluded_keys {
            output.push_str(&format!(" {}", quote(key)));
        }
        output.push('\n');
    }
    output.push_str("}\n");

    output
}

/// Render the default configuration
pub fn generate_default_config() -> String {
    generate_config(&Config::default())
}

/// Quote a string as a KDL v1 string literal
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

/// Validate that the generated KDL parses back into a configuration.
fn validate_kdl(content: &str) -> Result<(), ConfigError> {
    crate::parser::parse_config_str(content).map_err(|e| ConfigError::Invalid {
        message: format!(
            "Generated configuration is invalid (this is a bug in tapshow): {}",
            e
        ),
    })?;
    Ok(())
}

/// Write a configuration file using an atomic rename.
///
/// The content is validated before anything touches the disk, then written
/// to a temporary file next to `path` and renamed over it. If validation or
/// the write fails the original file is preserved.
pub fn write_config(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let content = generate_config(config);

    validate_kdl(&content)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Temp file must be in the same directory for the rename to be atomic
    let temp_path = path.with_extension("kdl.tmp");

    if let Err(e) = std::fs::write(&temp_path, &content) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    tracing::info!("Wrote configuration to {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use crate::parser::parse_config_str;

    #[test]
    fn test_default_config_round_trips() {
        let content = generate_default_config();
        let parsed = parse_config_str(&content).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_default_config_shows_exclusion_example() {
        let content = generate_default_config();
        assert!(content.contains("// excluded-keys \"CapsLock\" \"Ctrl+Shift+S\""));
    }

    #[test]
    fn test_custom_config_round_trips() {
        let config = Config {
            global: GlobalConfig {
                log_level: LogLevel::Warn,
            },
            display: DisplayConfig {
                show_held_keys: false,
                held_key_timeout_ms: 1200,
                history_count: 0,
            },
            behavior: BehaviorConfig {
                combine_modifiers: false,
                show_modifier_only: true,
                excluded_keys: vec!["CapsLock".to_string(), "Ctrl + Alt + Delete".to_string()],
            },
        };

        let parsed = parse_config_str(&generate_config(&config)).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("\\"), "\"\\\\\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn test_write_config_creates_parent_dirs() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("tapshow").join("config.kdl");

        write_config(&Config::default(), &path).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("kdl.tmp").exists());
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(parse_config_str(&written).unwrap(), Config::default());
    }

    #[test]
    fn test_write_config_replaces_existing_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.kdl");
        std::fs::write(&path, "stale").unwrap();

        let mut config = Config::default();
        config.display.history_count = 7;
        write_config(&config, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(parse_config_str(&written).unwrap().display.history_count, 7);
    }
}
