//! Direct transport: WMO bulletins delimited by control bytes.
//!
//! ```text
//! SOH [seq-number WS] header RS body ETX
//! ```
//!
//! The parser is fed one byte at a time and yields a record whenever an ETX
//! completes a valid message from the accepted office.

use crate::error::MessageError;
use crate::header::MAX_HEADER_LEN;
use crate::message::{DcpConverter, ParseStats, ParserConfig};
use crate::record::{DcpRecord, MIN_BODY_LEN};

/// Start of message.
pub const SOH: u8 = 0x01;
/// End of message.
pub const ETX: u8 = 0x03;
/// Separates the product header from the DCP message body.
pub const HEADER_END: u8 = 0x1E;

/// Capacity of the message body buffer.
pub const MAX_BODY_LEN: usize = 20_000;

/// Where the parser is within the current bulletin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WmoState {
    Hunting,
    SequenceNumber,
    ProductHeader,
    DcpMessageBody,
}

/// Byte-at-a-time parser for the direct transport.
#[derive(Debug)]
pub struct WmoDcpParser {
    converter: DcpConverter,
    state: WmoState,
    sequence: Option<u32>,
    header: Vec<u8>,
    body: Vec<u8>,
}

impl WmoDcpParser {
    /// Parser waiting for the start of a bulletin.
    pub fn new(config: ParserConfig) -> Self {
        Self {
            converter: DcpConverter::new(config),
            state: WmoState::Hunting,
            sequence: None,
            header: Vec::with_capacity(MAX_HEADER_LEN),
            body: Vec::with_capacity(MAX_BODY_LEN),
        }
    }

    /// Current parse state.
    pub fn state(&self) -> WmoState {
        self.state
    }

    /// Message tallies since this parser was created.
    pub fn stats(&self) -> ParseStats {
        self.converter.stats()
    }

    /// Consume one byte. Returns a record when this byte completes one.
    pub fn feed(&mut self, byte: u8) -> Option<DcpRecord> {
        match self.state {
            WmoState::Hunting => {
                if byte == SOH {
                    self.start_message();
                }
            }
            WmoState::SequenceNumber => self.sequence_byte(byte),
            WmoState::ProductHeader => self.header_byte(byte),
            WmoState::DcpMessageBody => return self.body_byte(byte),
        }
        None
    }

    /// Feed a slice, collecting every completed record.
    pub fn feed_all(&mut self, bytes: &[u8]) -> Vec<DcpRecord> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }

    fn start_message(&mut self) {
        self.header.clear();
        self.body.clear();
        self.sequence = None;
        self.state = if self.converter.config().sequenced {
            WmoState::SequenceNumber
        } else {
            WmoState::ProductHeader
        };
    }

    fn sequence_byte(&mut self, byte: u8) {
        match byte {
            b'0'..=b'9' => {
                let digit = (byte - b'0') as u32;
                let value = self.sequence.unwrap_or(0);
                match value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                    Some(v) => self.sequence = Some(v),
                    None => self.abort(MessageError::BadSequence(byte)),
                }
            }
            b if b.is_ascii_whitespace() => {
                if self.sequence.is_some() {
                    self.state = WmoState::ProductHeader;
                }
            }
            SOH => self.start_message(),
            other => self.abort(MessageError::BadSequence(other)),
        }
    }

    fn header_byte(&mut self, byte: u8) {
        match byte {
            HEADER_END => {
                if self.converter.accept_header(&self.header) {
                    self.body.clear();
                    self.state = WmoState::DcpMessageBody;
                } else {
                    self.state = WmoState::Hunting;
                }
            }
            SOH => self.header.clear(),
            b if b.is_ascii_whitespace() && self.header.is_empty() => {}
            b => {
                self.header.push(b);
                if self.header.len() >= MAX_HEADER_LEN {
                    self.abort(MessageError::HeaderOverflow(MAX_HEADER_LEN));
                }
            }
        }
    }

    fn body_byte(&mut self, byte: u8) -> Option<DcpRecord> {
        match byte {
            ETX => {
                self.state = WmoState::Hunting;
                if self.body.len() < MIN_BODY_LEN {
                    self.converter.reject(MessageError::TooShort {
                        min: MIN_BODY_LEN,
                        actual: self.body.len(),
                    });
                    return None;
                }
                self.converter.finish(&self.body, self.sequence)
            }
            SOH => {
                self.header.clear();
                self.body.clear();
                self.state = WmoState::ProductHeader;
                None
            }
            b => {
                self.body.push(b);
                if self.body.len() >= MAX_BODY_LEN {
                    self.abort(MessageError::BodyOverflow(MAX_BODY_LEN));
                }
                None
            }
        }
    }

    fn abort(&mut self, err: MessageError) {
        self.converter.reject(err);
        self.state = WmoState::Hunting;
    }
}
