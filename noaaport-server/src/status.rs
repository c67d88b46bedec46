use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use noaaport_rs_protocol::{LinkStatus, StatusSink};
use tokio::sync::watch;
use tracing::debug;

struct BoardInner {
    status: watch::Sender<LinkStatus>,
    good: AtomicU64,
    bad: AtomicU64,
}

/// Current link state and message quality counters for one receiver.
///
/// Clone is cheap (Arc). Readers can poll [`status`](Self::status) or await
/// transitions through [`watch`](Self::watch).
#[derive(Clone)]
pub struct StatusBoard(Arc<BoardInner>);

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        let (status, _) = watch::channel(LinkStatus::Disconnected);
        Self(Arc::new(BoardInner {
            status,
            good: AtomicU64::new(0),
            bad: AtomicU64::new(0),
        }))
    }

    pub fn status(&self) -> LinkStatus {
        *self.0.status.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<LinkStatus> {
        self.0.status.subscribe()
    }

    /// Good and bad message totals across all sessions.
    pub fn quality(&self) -> (u64, u64) {
        (
            self.0.good.load(Ordering::Relaxed),
            self.0.bad.load(Ordering::Relaxed),
        )
    }
}

impl StatusSink for StatusBoard {
    fn set_status(&self, status: LinkStatus) {
        debug!(%status, "link status");
        self.0.status.send_replace(status);
    }

    fn record_quality(&self, good: u64, bad: u64) {
        self.0.good.fetch_add(good, Ordering::Relaxed);
        self.0.bad.fetch_add(bad, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected() {
        let board = StatusBoard::new();
        assert_eq!(board.status(), LinkStatus::Disconnected);
        assert_eq!(board.quality(), (0, 0));
    }

    #[test]
    fn quality_accumulates() {
        let board = StatusBoard::new();
        board.record_quality(10, 1);
        board.clone().record_quality(5, 2);
        assert_eq!(board.quality(), (15, 3));
    }

    #[tokio::test]
    async fn watch_sees_transitions() {
        let board = StatusBoard::new();
        let mut rx = board.watch();
        board.set_status(LinkStatus::Listening);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), LinkStatus::Listening);
        assert_eq!(board.status(), LinkStatus::Listening);
    }
}
