//! tapshow CLI
//!
//! Configuration and diagnostics tool for tapshow.

use std::path::Path;

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use tapshow_config::{Config, DEFAULT_CONFIG_PATH};
use tapshow_daemon::device::{DeviceClass, DeviceSource, EvdevSource};
use tapshow_daemon::normalize;

#[derive(Parser, Debug)]
#[command(name = "tapshow")]
#[command(about = "Keystroke visualizer for Linux")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// List input devices and whether tapshow would read them
    Devices,

    /// Print the configuration file path
    Path,

    /// Write a commented default configuration
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the canonical form of an exclusion rule
    Normalize {
        /// Key name or combo, e.g. "Ctrl+Shift+S"
        rule: String,
    },
}

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path = tapshow_config::expand_path(&cli.config);

    match cli.command {
        Commands::Validate => cmd_validate(&config_path),
        Commands::Devices => cmd_devices(),
        Commands::Path => cmd_path(&config_path),
        Commands::Init { force } => cmd_init(&config_path, force),
        Commands::Normalize { rule } => cmd_normalize(&config_path, &rule),
    }
}

fn cmd_validate(config_path: &Path) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = tapshow_config::parse_config(config_path)?;

    println!("Configuration is valid!");
    println!("  Log level: {}", config.global.log_level.as_filter());
    println!(
        "  Held keys: {} (after {} ms)",
        on_off(config.display.show_held_keys),
        config.display.held_key_timeout_ms
    );
    println!("  History: {} entries", config.display.history_count);
    println!(
        "  Combine modifiers: {}",
        on_off(config.behavior.combine_modifiers)
    );
    println!(
        "  Modifier-only presses: {}",
        on_off(config.behavior.show_modifier_only)
    );
    println!("  Excluded keys: {}", config.behavior.excluded_keys.len());
    for rule in &config.behavior.excluded_keys {
        println!("    - {} ({})", rule, normalize(rule));
    }

    Ok(())
}

fn cmd_devices() -> miette::Result<()> {
    let source = EvdevSource::new();
    let paths = source.device_paths().into_diagnostic()?;

    println!("Available input devices:\n");

    let mut keyboards = 0;
    let mut unreadable = 0;

    for path in paths {
        let caps = match source.probe(&path) {
            Ok(caps) => caps,
            Err(e) => {
                tracing::debug!("Could not probe {}: {}", path.display(), e);
                unreadable += 1;
                continue;
            }
        };

        let class = caps.classify();
        if class == DeviceClass::Keyboard {
            keyboards += 1;
        }

        println!("  {} [{}]", caps.name, class);
        println!("    Path: {}", path.display());
        if let Ok(device) = evdev::Device::open(&path) {
            let id = device.input_id();
            println!("    ID: {:04x}:{:04x}", id.vendor(), id.product());
        }
        println!();
    }

    println!("{} keyboard(s) would be read", keyboards);
    if unreadable > 0 {
        println!(
            "{} device(s) could not be opened - ensure you're in the 'input' group",
            unreadable
        );
    }

    Ok(())
}

fn cmd_path(config_path: &Path) -> miette::Result<()> {
    println!("{}", config_path.display());
    if !config_path.exists() {
        println!("(not created yet, defaults are in effect; run `tapshow init`)");
    }
    Ok(())
}

fn cmd_init(config_path: &Path, force: bool) -> miette::Result<()> {
    if config_path.exists() && !force {
        return Err(miette::miette!(
            help = "pass --force to overwrite it",
            "{} already exists",
            config_path.display()
        ));
    }

    tapshow_config::write_config(&Config::default(), config_path)?;

    println!("Wrote default configuration: {}", config_path.display());
    Ok(())
}

fn cmd_normalize(config_path: &Path, rule: &str) -> miette::Result<()> {
    let canonical = normalize(rule);
    println!("{}", canonical);

    // Report a matching rule from the current config, if it loads
    match tapshow_config::load_config(config_path) {
        Ok(config) => {
            if let Some(existing) = config
                .behavior
                .excluded_keys
                .iter()
                .find(|existing| normalize(existing) == canonical)
            {
                println!("Already excluded by \"{}\"", existing);
            }
        }
        Err(e) => tracing::debug!("Not checking existing rules: {}", e),
    }

    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
