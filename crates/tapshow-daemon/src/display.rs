//! Display side of the pipeline
//!
//! The pipeline does not render anything itself. A [`DisplaySink`] receives
//! each display event, the history after every change and an externally
//! driven pause flag. [`run_display`] feeds a sink from a [`DisplayStream`].
//!
//! [`TerminalSink`] is the sink used by `tapshowd`: plain text lines for a
//! terminal, or JSON lines for an overlay process reading stdout.
//!
//! # Example
//!
//! ```no_run
//! use tapshow_daemon::device::EvdevSource;
//! use tapshow_daemon::display::{run_display, OutputFormat, TerminalSink};
//! use tapshow_daemon::pipeline::Pipeline;
//! use tapshow_daemon::processor::ProcessorConfig;
//! use tokio::sync::watch;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let (pipeline, stream) = Pipeline::start(&EvdevSource::new(), ProcessorConfig::default())?;
//! let (_pause, pause_rx) = watch::channel(false);
//! let sink = TerminalSink::new(std::io::stdout(), OutputFormat::Text);
//!
//! let listener = pipeline.shutdown_handle().subscribe();
//! run_display(sink, stream, pause_rx, listener).await?;
//! pipeline.join().await;
//! # Ok(())
//! # }
//! ```

use std::io::{self, Write};

use serde::Serialize;
use tokio::sync::watch;

use crate::event::DisplayEvent;
use crate::processor::DisplayStream;
use crate::shutdown::ShutdownListener;

/// Receiver of display updates
pub trait DisplaySink {
    /// Present one display event
    fn show(&mut self, event: &DisplayEvent) -> io::Result<()>;

    /// Replace the shown history, oldest first
    fn update_history(&mut self, history: &[DisplayEvent]) -> io::Result<()>;

    /// While paused the sink must not show anything
    fn set_paused(&mut self, paused: bool) -> io::Result<()>;
}

/// Forward display events to `sink` until shutdown or until the processor
/// stops.
///
/// Non-held events are followed by the current history snapshot. Changes
/// of `pause` are applied as they arrive; if its sender goes away the last
/// state stays in effect.
pub async fn run_display<S>(
    mut sink: S,
    mut stream: DisplayStream,
    mut pause: watch::Receiver<bool>,
    mut shutdown: ShutdownListener,
) -> io::Result<()>
where
    S: DisplaySink,
{
    sink.set_paused(*pause.borrow_and_update())?;
    let mut pause_open = true;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            changed = pause.changed(), if pause_open => match changed {
                Ok(()) => {
                    let paused = *pause.borrow_and_update();
                    tracing::info!("Display {}", if paused { "paused" } else { "resumed" });
                    sink.set_paused(paused)?;
                }
                Err(_) => pause_open = false,
            },
            event = stream.events.recv() => match event {
                Some(event) => {
                    sink.show(&event)?;
                    if !event.is_held {
                        sink.update_history(&stream.history.snapshot())?;
                    }
                }
                None => break,
            },
        }
    }

    Ok(())
}

/// Line format written by [`TerminalSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One line per key, held indications included
    #[default]
    Text,
    /// One JSON object per line, tagged by `type`
    Json,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JsonLine<'a> {
    Key(&'a DisplayEvent),
    History { entries: Vec<&'a str> },
    Pause { paused: bool },
}

/// Writes display updates to any [`Write`], usually stdout
#[derive(Debug)]
pub struct TerminalSink<W> {
    out: W,
    format: OutputFormat,
    paused: bool,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            paused: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_json(&mut self, line: &JsonLine<'_>) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, line)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

impl<W: Write> DisplaySink for TerminalSink<W> {
    fn show(&mut self, event: &DisplayEvent) -> io::Result<()> {
        if self.paused {
            return Ok(());
        }
        match self.format {
            OutputFormat::Text => {
                writeln!(self.out, "{}", event.text)?;
                self.out.flush()
            }
            OutputFormat::Json => self.write_json(&JsonLine::Key(event)),
        }
    }

    fn update_history(&mut self, history: &[DisplayEvent]) -> io::Result<()> {
        if self.paused || self.format == OutputFormat::Text {
            return Ok(());
        }
        let entries = history.iter().map(|e| e.text.as_str()).collect();
        self.write_json(&JsonLine::History { entries })
    }

    fn set_paused(&mut self, paused: bool) -> io::Result<()> {
        if self.paused == paused {
            return Ok(());
        }
        self.paused = paused;
        match self.format {
            OutputFormat::Text => Ok(()),
            OutputFormat::Json => self.write_json(&JsonLine::Pause { paused }),
        }
    }
}
