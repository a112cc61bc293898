use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Handle that stops the pipeline when triggered or dropped.
#[derive(Debug)]
pub struct Shutdown {
    _tx: Sender<()>,
}

/// Listener side of the shutdown signal, cloned into every worker.
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: Receiver<()>,
}

/// Creates a linked shutdown handle and listener pair.
pub fn shutdown_channel() -> (Shutdown, ShutdownListener) {
    let (tx, rx) = bounded(0);
    (Shutdown { _tx: tx }, ShutdownListener { rx })
}

impl Shutdown {
    /// Signals all listeners to stop.
    pub fn trigger(self) {
        // Dropping the sender disconnects every listener.
    }
}

impl ShutdownListener {
    /// Sleeps for one tick. Returns `false` if shutdown was requested,
    /// either during the sleep or before it.
    pub fn sleep(&self, timeout: Duration) -> bool {
        matches!(self.rx.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
    }

    /// Non-blocking check for a pending shutdown request.
    pub fn is_shutdown(&self) -> bool {
        !matches!(self.rx.try_recv(), Err(TryRecvError::Empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_keeps_running_until_triggered() {
        let (shutdown, listener) = shutdown_channel();
        assert!(!listener.is_shutdown());
        assert!(listener.sleep(Duration::from_millis(1)));
        shutdown.trigger();
        assert!(listener.is_shutdown());
        assert!(!listener.sleep(Duration::from_millis(1)));
    }

    #[test]
    fn dropping_the_handle_stops_all_listeners() {
        let (shutdown, listener) = shutdown_channel();
        let second = listener.clone();
        drop(shutdown);
        assert!(second.is_shutdown());
        assert!(listener.is_shutdown());
    }
}
