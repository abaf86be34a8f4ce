//! Shutdown signalling
//!
//! A cooperative cancellation pair for the accept loop. The trigger side is
//! cheap to clone and can be moved into a signal handler; the signal side is
//! owned by the listener.

use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Create a connected trigger/signal pair
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = channel::bounded(1);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

/// Requests shutdown of the listener holding the matching signal
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Sender<()>,
}

impl ShutdownTrigger {
    /// Ask the listener to stop. Firing more than once is harmless.
    pub fn fire(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Observed by the accept loop between accepts
///
/// Shutdown is also considered requested once every trigger has been dropped.
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: Receiver<()>,
}

impl ShutdownSignal {
    /// Non-blocking check
    pub fn is_triggered(&self) -> bool {
        !matches!(self.rx.try_recv(), Err(TryRecvError::Empty))
    }

    /// Wait up to `timeout` for shutdown; returns true if it was requested
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        !matches!(self.rx.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
    }
}
