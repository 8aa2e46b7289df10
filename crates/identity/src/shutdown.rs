//! Cooperative shutdown signalling for the seeding loops.
//!
//! The inter-attempt delay in the bootstrap loop must not block process
//! shutdown, so the sleeper races against this signal. A triggered signal
//! aborts the bootstrap without counting as a failure.

use tokio::sync::watch;

/// Sending half; owned by whoever decides the process is shutting down.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

/// Receiving half; cheap to clone, one per seeding loop.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle/signal pair.
pub fn channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, ShutdownSignal { rx })
}

impl ShutdownHandle {
    /// Signal shutdown to every connected [`ShutdownSignal`].
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

impl ShutdownSignal {
    /// Whether shutdown has already been signalled.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is signalled. If the handle is dropped
    /// without ever signalling, this pends forever; callers always race
    /// it against the work they actually want to do.
    pub async fn triggered(&mut self) {
        while !*self.rx.borrow() {
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
