//! Single-use stop signal between the control plane and one task runner.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Sending half, kept by the control plane.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: mpsc::Sender<()>,
}

/// Receiving half, owned by the task runner.
#[derive(Debug)]
pub struct StopSignal {
    rx: mpsc::Receiver<()>,
}

/// Result of [`StopHandle::request_stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopRequest {
    /// The signal is buffered for the runner.
    Delivered,
    /// A signal was already pending; nothing more was queued.
    AlreadyPending,
    /// The runner is gone (it failed or already stopped).
    Closed,
}

/// Create a stop channel buffered for exactly one signal.
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = mpsc::channel(1);
    (StopHandle { tx }, StopSignal { rx })
}

impl StopHandle {
    /// Queue the stop signal without blocking.
    pub fn request_stop(&self) -> StopRequest {
        match self.tx.try_send(()) {
            Ok(()) => StopRequest::Delivered,
            Err(TrySendError::Full(())) => StopRequest::AlreadyPending,
            Err(TrySendError::Closed(())) => StopRequest::Closed,
        }
    }
}

impl StopSignal {
    /// Wait for the stop signal.
    ///
    /// Also returns when every `StopHandle` was dropped, since nobody could
    /// stop the runner after that.
    pub async fn recv(&mut self) {
        let _ = self.rx.recv().await;
    }
}
