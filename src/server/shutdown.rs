//! Shutdown signal propagation.
//!
//! The server owns a `broadcast::Sender` whose only purpose is to be
//! dropped when shutdown begins; every connection handler holds a
//! [`Shutdown`] wrapping a subscribed receiver. Receiving either a sent
//! value or the channel-closed error counts as the signal, so dropping
//! the sender is enough to wake every handler blocked in `recv`.

use tokio::sync::broadcast;

/// Listens for the server-wide shutdown signal.
///
/// Once the signal is observed it is latched: `is_shutdown` keeps
/// returning `true` for the rest of the connection's life.
#[derive(Debug)]
pub struct Shutdown {
    /// `true` once the signal has been received
    is_shutdown: bool,

    /// Receiving half of the shutdown broadcast channel
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    /// Creates a new `Shutdown` backed by the given receiver.
    pub fn new(notify: broadcast::Receiver<()>) -> Self {
        Self {
            is_shutdown: false,
            notify,
        }
    }

    /// Returns `true` if the shutdown signal has been received.
    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown
    }

    /// Waits for the shutdown signal.
    ///
    /// Returns immediately if the signal was already observed.
    pub async fn recv(&mut self) {
        if self.is_shutdown {
            return;
        }

        // A lagged or closed channel is still a shutdown signal; only
        // one value is ever sent, so there is nothing to disambiguate.
        let _ = self.notify.recv().await;

        self.is_shutdown = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recv_on_dropped_sender() {
        let (tx, rx) = broadcast::channel(1);
        let mut shutdown = Shutdown::new(rx);

        assert!(!shutdown.is_shutdown());
        drop(tx);

        shutdown.recv().await;
        assert!(shutdown.is_shutdown());

        // Latched: further calls return immediately.
        shutdown.recv().await;
        assert!(shutdown.is_shutdown());
    }

    #[tokio::test]
    async fn test_recv_on_sent_signal() {
        let (tx, rx) = broadcast::channel(1);
        let mut shutdown = Shutdown::new(rx);

        tx.send(()).unwrap();
        shutdown.recv().await;
        assert!(shutdown.is_shutdown());
    }

    #[test]
    fn test_recv_pending_until_signal() {
        use tokio_test::{assert_pending, assert_ready, task};

        let (tx, rx) = broadcast::channel(1);
        let mut shutdown = Shutdown::new(rx);

        let mut recv = task::spawn(shutdown.recv());
        assert_pending!(recv.poll());

        tx.send(()).unwrap();
        assert!(recv.is_woken());
        assert_ready!(recv.poll());
        drop(recv);

        assert!(shutdown.is_shutdown());
    }
}
