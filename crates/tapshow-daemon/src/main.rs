//! tapshow daemon
//!
//! Captures keystrokes from every keyboard and prints them as display
//! events on stdout.

use anyhow::{Context, Result};
use clap::Parser;
use tapshow_config::DEFAULT_CONFIG_PATH;
use tapshow_daemon::device::EvdevSource;
use tapshow_daemon::display::{run_display, OutputFormat, TerminalSink};
use tapshow_daemon::{Pipeline, ProcessorConfig};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tapshowd")]
#[command(about = "Keystroke capture daemon for tapshow")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Print display events as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Expand tilde in config path
    let config_path = tapshow_config::expand_path(&args.config);
    let config = tapshow_config::load_config(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.global.log_level.as_filter())),
        )
        .init();

    tracing::info!("Using configuration from {}", config_path.display());

    let mut sigusr1 = signal(SignalKind::user_defined1())
        .context("Failed to set up SIGUSR1 handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to set up SIGTERM handler")?;

    let (pipeline, stream) = Pipeline::start(&EvdevSource::new(), ProcessorConfig::from(&config))
        .context("Failed to start keyboard capture")?;

    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let sink = TerminalSink::new(std::io::stdout(), format);
    let (pause_tx, pause_rx) = watch::channel(false);
    let shutdown = pipeline.shutdown_handle();
    let mut display = tokio::spawn(run_display(sink, stream, pause_rx, shutdown.subscribe()));

    tracing::info!("tapshow daemon running (SIGUSR1 toggles pause)");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT");
                break;
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
                break;
            }
            _ = sigusr1.recv() => {
                pause_tx.send_modify(|paused| *paused = !*paused);
            }
            result = &mut display => {
                match result {
                    Ok(Ok(())) => tracing::info!("Display stopped"),
                    Ok(Err(e)) => tracing::error!("Display output failed: {}", e),
                    Err(e) => tracing::error!("Display task failed: {}", e),
                }
                break;
            }
        }
    }

    tracing::info!("Shutting down...");
    pipeline.stop();

    for (path, exit) in pipeline.join().await {
        tracing::debug!("{}: {:?}", path.display(), exit);
    }
    if !display.is_finished() {
        display.await.context("Display task failed")??;
    }

    Ok(())
}
