//! Collaborators that receive the output of a session.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::record::DcpRecord;

/// Destination for completed records.
pub trait RecordSink: Send + Sync {
    fn archive(&self, record: DcpRecord);
}

impl<T: RecordSink + ?Sized> RecordSink for Arc<T> {
    fn archive(&self, record: DcpRecord) {
        (**self).archive(record)
    }
}

impl RecordSink for mpsc::UnboundedSender<DcpRecord> {
    fn archive(&self, record: DcpRecord) {
        // Receiver gone means nobody is archiving; nothing to do.
        let _ = self.send(record);
    }
}

/// Coarse link state shown to operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkStatus {
    Listening,
    Connecting,
    Connected,
    Disconnected,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listening => "Listening",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives link state transitions and message quality counts.
pub trait StatusSink: Send + Sync {
    fn set_status(&self, status: LinkStatus);

    /// Add good and bad message counts from a finished session.
    fn record_quality(&self, _good: u64, _bad: u64) {}
}

impl<T: StatusSink + ?Sized> StatusSink for Arc<T> {
    fn set_status(&self, status: LinkStatus) {
        (**self).set_status(status)
    }

    fn record_quality(&self, good: u64, bad: u64) {
        (**self).record_quality(good, bad)
    }
}

/// Discards status updates.
impl StatusSink for () {
    fn set_status(&self, _status: LinkStatus) {}
}
