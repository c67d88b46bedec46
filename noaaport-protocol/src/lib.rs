//! NOAAPORT DCP message framing and DOMSAT record conversion.
//!
//! This crate holds everything both connection roles share: the direct
//! (SOH/RS/ETX) and PDI parsers, header acceptance, conversion to canonical
//! records, and the per-connection read loop.

pub mod error;
pub mod header;
pub mod message;
pub mod pdi;
pub mod record;
pub mod session;
pub mod sink;
pub mod time;
pub mod wmo;

pub use error::{MessageError, NoaaportError, Result};
pub use message::{ParseStats, ParserConfig};
pub use pdi::PdiFrameParser;
pub use record::DcpRecord;
pub use session::{ByteReader, Framing, SessionConfig, SessionEnd, SessionSummary, run_session};
pub use sink::{LinkStatus, RecordSink, StatusSink};
pub use time::Clock;
pub use wmo::WmoDcpParser;
