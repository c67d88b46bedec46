//! The inner message step shared by both transports: accept a header,
//! convert a body, keep the tallies.

use tracing::{trace, warn};

use crate::error::MessageError;
use crate::header;
use crate::record::{self, DcpRecord};
use crate::time::Clock;

/// Settings for the inner WMO/DCP parser.
#[derive(Clone, Debug)]
pub struct ParserConfig {
    /// Office id that marks a bulletin as ours. Default: `"KWAL"`.
    pub office_id: String,
    /// Whether each SOH is followed by a decimal sequence number. Default: `false`.
    pub sequenced: bool,
    /// Clock used to infer the year of each message. Default: system clock.
    pub clock: Clock,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            office_id: header::DEFAULT_OFFICE_ID.to_owned(),
            sequenced: false,
            clock: Clock::System,
        }
    }
}

/// Per-connection message tallies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Records produced.
    pub messages: u64,
    /// Messages lost to framing or validation errors.
    pub parse_errors: u64,
    /// Bulletins skipped because they are not DCP messages for our office.
    pub foreign: u64,
}

/// Header check and body conversion, composed into each transport parser.
#[derive(Debug)]
pub(crate) struct DcpConverter {
    config: ParserConfig,
    stats: ParseStats,
}

impl DcpConverter {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            stats: ParseStats::default(),
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// Returns `true` if the header belongs to a DCP bulletin from our office.
    pub fn accept_header(&mut self, header: &[u8]) -> bool {
        match header::validate(header, &self.config.office_id) {
            Ok(()) => true,
            Err(e) => {
                self.reject(e);
                false
            }
        }
    }

    /// Convert a message body, counting the outcome.
    pub fn finish(&mut self, body: &[u8], sequence: Option<u32>) -> Option<DcpRecord> {
        match record::convert(body, self.config.clock.now(), sequence) {
            Ok(rec) => {
                self.stats.messages += 1;
                trace!(
                    address = rec.address(),
                    channel = rec.channel(),
                    len = rec.data().len(),
                    "DCP message"
                );
                Some(rec)
            }
            Err(e) => {
                self.reject(e);
                None
            }
        }
    }

    /// Log and count a dropped message.
    pub fn reject(&mut self, err: MessageError) {
        if err.is_foreign() {
            self.stats.foreign += 1;
            trace!(reason = %err, "skipping bulletin");
        } else {
            self.stats.parse_errors += 1;
            warn!(error = %err, "discarding message");
        }
    }
}
