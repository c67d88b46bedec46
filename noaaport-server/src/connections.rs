//! The listener's single active-producer slot.
//!
//! Only one producer feeds the receiver at a time. Activating a new one
//! signals the previous handler to stop; the brief overlap while it winds
//! down is harmless because each handler owns its own parser.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tokio::sync::oneshot;

/// Metadata for the producer currently feeding the listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProducerInfo {
    pub id: u64,
    pub addr: SocketAddr,
    pub connected_at: SystemTime,
}

struct Active {
    info: ProducerInfo,
    stop: oneshot::Sender<()>,
}

struct SlotInner {
    next_id: AtomicU64,
    active: Mutex<Option<Active>>,
}

/// Clone is cheap (Arc).
#[derive(Clone)]
pub(crate) struct ProducerSlot(Arc<SlotInner>);

impl ProducerSlot {
    pub fn new() -> Self {
        Self(Arc::new(SlotInner {
            next_id: AtomicU64::new(1),
            active: Mutex::new(None),
        }))
    }

    /// Make `addr` the active producer, stopping whoever held the slot.
    ///
    /// Returns the new id, the receiver that fires when this producer is
    /// replaced, and the replaced producer if there was one.
    pub fn activate(
        &self,
        addr: SocketAddr,
    ) -> (u64, oneshot::Receiver<()>, Option<ProducerInfo>) {
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        let (stop, stopped) = oneshot::channel();
        let info = ProducerInfo {
            id,
            addr,
            connected_at: SystemTime::now(),
        };
        let previous = self
            .0
            .active
            .lock()
            .unwrap()
            .replace(Active { info, stop });
        let replaced = previous.map(|prev| {
            // The old handler may already be gone.
            let _ = prev.stop.send(());
            prev.info
        });
        (id, stopped, replaced)
    }

    /// Clear the slot if `id` still holds it. Returns whether it did.
    pub fn release(&self, id: u64) -> bool {
        let mut active = self.0.active.lock().unwrap();
        if active.as_ref().is_some_and(|a| a.info.id == id) {
            *active = None;
            true
        } else {
            false
        }
    }

    /// The producer holding the slot, if any.
    pub fn current(&self) -> Option<ProducerInfo> {
        self.0.active.lock().unwrap().as_ref().map(|a| a.info)
    }

    /// Stop the active producer, if any.
    pub fn terminate(&self) -> Option<ProducerInfo> {
        let active = self.0.active.lock().unwrap().take()?;
        let _ = active.stop.send(());
        Some(active.info)
    }
}
