use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use futures_core::Stream;
use noaaport_rs_protocol::{DcpRecord, RecordSink};
use tokio::sync::Notify;
use tracing::trace;

/// Sequence numbers assigned by the archive run `0..SEQUENCE_MODULUS`.
pub const SEQUENCE_MODULUS: u32 = 65_536;

/// Default number of records kept in memory.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Wrapping counter for records that arrive without a transport sequence
/// number.
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    next: AtomicU32,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first % SEQUENCE_MODULUS),
        }
    }

    /// Take the next number. After `SEQUENCE_MODULUS - 1` comes 0.
    pub fn next(&self) -> u32 {
        match self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some((n + 1) % SEQUENCE_MODULUS)
            }) {
            Ok(prev) | Err(prev) => prev,
        }
    }
}

/// A record together with its position in the archive.
///
/// `index` grows without bound and is what readers use as a cursor;
/// sequence numbers wrap and cannot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Archived {
    pub index: u64,
    pub record: DcpRecord,
}

struct Ring {
    buf: VecDeque<Archived>,
    capacity: usize,
    next_index: u64,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity: capacity.max(1),
            next_index: 1,
        }
    }

    fn push(&mut self, record: DcpRecord) -> u64 {
        let index = self.next_index;
        self.next_index += 1;
        self.buf.push_back(Archived { index, record });
        if self.buf.len() > self.capacity {
            self.buf.pop_front();
        }
        index
    }

    fn read_since(&self, cursor: u64) -> Vec<Archived> {
        self.buf
            .iter()
            .filter(|a| a.index > cursor)
            .cloned()
            .collect()
    }
}

struct ArchiveInner {
    ring: Mutex<Ring>,
    notify: Notify,
    sequence: SequenceGenerator,
}

/// In-memory archive of the most recent records.
///
/// Clone is cheap (Arc). Records without a sequence number get one from the
/// archive's [`SequenceGenerator`]; records that already carry one keep it.
#[derive(Clone)]
pub struct MsgArchive(Arc<ArchiveInner>);

impl Default for MsgArchive {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MsgArchive {
    pub fn new(capacity: usize) -> Self {
        Self::with_generator(capacity, SequenceGenerator::new())
    }

    pub fn with_generator(capacity: usize, sequence: SequenceGenerator) -> Self {
        Self(Arc::new(ArchiveInner {
            ring: Mutex::new(Ring::new(capacity)),
            notify: Notify::new(),
            sequence,
        }))
    }

    /// Store `record` and wake waiting readers. Returns its archive index.
    pub fn push(&self, mut record: DcpRecord) -> u64 {
        if record.sequence().is_none() {
            record.set_sequence(self.0.sequence.next());
        }
        trace!(address = record.address(), sequence = record.sequence(), "archived");
        let index = self.0.ring.lock().unwrap().push(record);
        self.0.notify.notify_waiters();
        index
    }

    pub fn len(&self) -> usize {
        self.0.ring.lock().unwrap().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the newest record, or 0 when nothing has been stored yet.
    pub fn last_index(&self) -> u64 {
        self.0.ring.lock().unwrap().next_index - 1
    }

    /// All retained records with index greater than `cursor`, oldest first.
    pub fn read_since(&self, cursor: u64) -> Vec<Archived> {
        self.0.ring.lock().unwrap().read_since(cursor)
    }

    /// Returns a future that completes on the next push.
    ///
    /// Create it *before* calling [`read_since`](Self::read_since) so a push
    /// in between is not missed.
    pub fn notified(&self) -> tokio::sync::futures::Notified<'_> {
        self.0.notify.notified()
    }

    /// Records stored from now on, as they arrive.
    ///
    /// If a reader falls more than the capacity behind, the evicted records
    /// are skipped.
    pub fn subscribe(&self) -> impl Stream<Item = DcpRecord> + Send + 'static {
        let archive = self.clone();
        let mut cursor = archive.last_index();
        async_stream::stream! {
            loop {
                let notified = archive.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                let batch = archive.read_since(cursor);
                if batch.is_empty() {
                    notified.await;
                    continue;
                }
                for archived in batch {
                    cursor = archived.index;
                    yield archived.record;
                }
            }
        }
    }
}

impl RecordSink for MsgArchive {
    fn archive(&self, record: DcpRecord) {
        self.push(record);
    }
}
