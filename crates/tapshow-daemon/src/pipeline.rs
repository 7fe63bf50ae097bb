//! Wiring of readers and processor into one running pipeline

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::device::DeviceSource;
use crate::error::InputError;
use crate::processor::{DisplayStream, Processor, ProcessorConfig};
use crate::reader::{KeyboardReader, ReaderExit, RAW_EVENT_BUFFER};
use crate::shutdown::Shutdown;

/// A running capture pipeline
#[derive(Debug)]
pub struct Pipeline {
    shutdown: Shutdown,
    reader: KeyboardReader,
    processor: JoinHandle<()>,
}

impl Pipeline {
    /// Open every usable keyboard and start processing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S>(source: &S, config: ProcessorConfig) -> Result<(Self, DisplayStream), InputError>
    where
        S: DeviceSource + ?Sized,
    {
        let shutdown = Shutdown::new();
        let (raw_tx, raw_rx) = mpsc::channel(RAW_EVENT_BUFFER);

        let reader = KeyboardReader::start(source, raw_tx, &shutdown)?;
        let (processor, stream) = Processor::new(&config);
        let processor = tokio::spawn(processor.run(raw_rx, shutdown.subscribe()));

        tracing::info!("Capturing from {} keyboard(s)", reader.device_count());

        Ok((
            Self {
                shutdown,
                reader,
                processor,
            },
            stream,
        ))
    }

    pub fn device_count(&self) -> usize {
        self.reader.device_count()
    }

    /// Handle for stopping the pipeline from elsewhere
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Signal every task to stop. Safe to call more than once.
    pub fn stop(&self) {
        if self.shutdown.trigger() {
            tracing::info!("Stopping pipeline");
        }
    }

    /// Wait for the readers and the processor to finish
    pub async fn join(self) -> Vec<(PathBuf, ReaderExit)> {
        let exits = self.reader.join().await;
        if let Err(e) = self.processor.await {
            tracing::warn!("Processor task failed: {}", e);
        }
        exits
    }
}
