//! Pipeline-wide shutdown signal
//!
//! A single [`Shutdown`] is shared by the owner of the pipeline; every device
//! read loop and the processor hold a [`ShutdownListener`]. Triggering is
//! idempotent, so repeated stop requests are harmless.

use std::sync::Arc;

use tokio::sync::watch;

/// Owner side of the shutdown signal
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Signal every listener to stop.
    ///
    /// Returns `true` only for the call that actually flipped the signal.
    pub fn trigger(&self) -> bool {
        let previous = self.sender.send_replace(true);
        if !previous {
            tracing::debug!("Shutdown triggered");
        }
        !previous
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener side of the shutdown signal
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Resolve once shutdown has been triggered.
    ///
    /// Also resolves if every [`Shutdown`] handle has been dropped, since
    /// nobody is left to keep the pipeline running. Cancel-safe.
    pub async fn wait(&mut self) {
        let _ = self.receiver.wait_for(|stopped| *stopped).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }
}
