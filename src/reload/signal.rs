//! Coalescing wake-up channel from the watcher thread to the event loop.
//!
//! The watcher writes one marker per accepted change with a non-blocking
//! send; a full channel already has a wake pending, so the marker is simply
//! dropped. The loop drains every pending marker on each wake, so any number
//! of writes between two reads is observed as one wake.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Markers the channel holds before further writes coalesce at the sender.
pub const SIGNAL_CAPACITY: usize = 64;

const MARKER: u8 = b'R';

pub fn channel() -> (ReloadSender, ReloadReceiver) {
    let (tx, rx) = mpsc::channel(SIGNAL_CAPACITY);
    (ReloadSender(tx), ReloadReceiver(rx))
}

#[derive(Debug, Clone)]
pub struct ReloadSender(mpsc::Sender<u8>);

#[derive(Debug)]
pub struct ReloadReceiver(mpsc::Receiver<u8>);

impl ReloadSender {
    /// Marks a reload as pending. Never blocks.
    ///
    /// Returns `false` only when the receiving side is gone.
    pub fn notify(&self) -> bool {
        match self.0.try_send(MARKER) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

impl ReloadReceiver {
    /// Waits for a wake and drains the channel.
    ///
    /// Returns how many markers were consumed, or `None` once every sender
    /// has been dropped and nothing is pending.
    pub async fn wait(&mut self) -> Option<usize> {
        self.0.recv().await?;
        Some(1 + self.drain())
    }

    /// Consumes every pending marker without waiting.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while self.0.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_is_one_wake() {
        let (tx, mut rx) = channel();
        for _ in 0..10 {
            assert!(tx.notify());
        }

        assert_eq!(rx.wait().await, Some(10));
        assert_eq!(rx.drain(), 0);
    }

    #[tokio::test]
    async fn writes_past_capacity_coalesce() {
        let (tx, mut rx) = channel();
        for _ in 0..SIGNAL_CAPACITY * 3 {
            assert!(tx.notify());
        }

        assert_eq!(rx.wait().await, Some(SIGNAL_CAPACITY));
    }

    #[tokio::test]
    async fn closed_when_sender_dropped() {
        let (tx, mut rx) = channel();
        tx.notify();
        drop(tx);

        assert_eq!(rx.wait().await, Some(1));
        assert_eq!(rx.wait().await, None);
    }

    #[test]
    fn notify_reports_missing_receiver() {
        let (tx, rx) = channel();
        drop(rx);
        assert!(!tx.notify());
    }
}
