//! Per-device read loops
//!
//! Every opened keyboard gets its own task that decodes 24-byte records and
//! forwards key events into one shared bounded channel. The channel is never
//! waited on: when the processor falls behind, new events are dropped so the
//! read loops keep draining the kernel buffers.
//!
//! ```text
//! +-----------+
//! | event0    | --+
//! +-----------+   |    +--------------+     +-----------+
//!                 +--> | mpsc (100)   | --> | Processor |
//! +-----------+   |    +--------------+     +-----------+
//! | event3    | --+
//! +-----------+
//! ```

use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::device::{locate_keyboards, no_keyboard_reason, DeviceSource};
use crate::error::InputError;
use crate::event::RawKeyEvent;
use crate::record::{InputRecord, INPUT_EVENT_SIZE};
use crate::shutdown::{Shutdown, ShutdownListener};

/// Capacity of the channel between the read loops and the processor
pub const RAW_EVENT_BUFFER: usize = 100;

/// Why a read loop ended
#[derive(Debug)]
pub enum ReaderExit {
    /// The shutdown signal fired
    Shutdown,
    /// The device reported end of file
    Closed,
    /// A read failed, e.g. the device was unplugged
    Failed(std::io::Error),
    /// The processor is gone
    ConsumerGone,
}

/// Running read loops, one per opened keyboard
#[derive(Debug)]
pub struct KeyboardReader {
    tasks: Vec<(PathBuf, JoinHandle<ReaderExit>)>,
}

impl KeyboardReader {
    /// Locate keyboards, open them and spawn one read loop each.
    ///
    /// A keyboard that fails to open is skipped. Fails if enumeration fails
    /// or if no keyboard could be opened at all.
    pub fn start<S>(
        source: &S,
        sender: mpsc::Sender<RawKeyEvent>,
        shutdown: &Shutdown,
    ) -> Result<Self, InputError>
    where
        S: DeviceSource + ?Sized,
    {
        let located = locate_keyboards(source)?;
        let mut tasks = Vec::with_capacity(located.paths.len());
        let mut open_failures = 0;

        for path in &located.paths {
            match source.open(path) {
                Ok(handle) => {
                    tracing::info!("Reading keyboard at {}", path.display());
                    let task = tokio::spawn(read_device(
                        path.clone(),
                        handle,
                        sender.clone(),
                        shutdown.subscribe(),
                    ));
                    tasks.push((path.clone(), task));
                }
                Err(e) => {
                    open_failures += 1;
                    tracing::warn!("Skipping keyboard at {}: {}", path.display(), e);
                }
            }
        }

        if tasks.is_empty() {
            return Err(InputError::NoUsableKeyboard(no_keyboard_reason(
                &located,
                open_failures,
            )));
        }

        tracing::debug!("Started {} keyboard reader(s)", tasks.len());

        Ok(Self { tasks })
    }

    pub fn device_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn devices(&self) -> impl Iterator<Item = &Path> {
        self.tasks.iter().map(|(path, _)| path.as_path())
    }

    /// Wait for every read loop to finish
    pub async fn join(self) -> Vec<(PathBuf, ReaderExit)> {
        let (paths, handles): (Vec<_>, Vec<_>) = self.tasks.into_iter().unzip();
        let results = futures::future::join_all(handles).await;

        paths
            .into_iter()
            .zip(results)
            .filter_map(|(path, result)| match result {
                Ok(exit) => Some((path, exit)),
                Err(e) => {
                    tracing::warn!("Reader for {} panicked: {}", path.display(), e);
                    None
                }
            })
            .collect()
    }
}

/// Read records from one device until shutdown, EOF or a read error.
async fn read_device<R>(
    path: PathBuf,
    mut device: R,
    sender: mpsc::Sender<RawKeyEvent>,
    mut shutdown: ShutdownListener,
) -> ReaderExit
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; INPUT_EVENT_SIZE];

    let exit = loop {
        let len = tokio::select! {
            biased;
            _ = shutdown.wait() => break ReaderExit::Shutdown,
            result = device.read(&mut buf) => match result {
                Ok(0) => break ReaderExit::Closed,
                Ok(len) => len,
                Err(e) => break ReaderExit::Failed(e),
            },
        };

        let record = match InputRecord::parse(&buf[..len]) {
            Ok(record) => record,
            Err(e) => {
                tracing::trace!("Skipping record from {}: {}", path.display(), e);
                continue;
            }
        };

        let Some(event) = record.key_event() else {
            continue;
        };

        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::trace!("Event queue full, dropping {}", event.name);
            }
            Err(TrySendError::Closed(_)) => break ReaderExit::ConsumerGone,
        }
    };

    match &exit {
        ReaderExit::Failed(e) => {
            tracing::warn!("Stopped reading {}: {}", path.display(), e);
        }
        other => {
            tracing::debug!("Reader for {} finished: {:?}", path.display(), other);
        }
    }

    exit
}
