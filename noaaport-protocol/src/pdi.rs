//! PDI packetized transport.
//!
//! The vendor strips SOH/ETX and splits each bulletin into frames, each
//! introduced by an ASCII flag byte:
//!
//! | flag  | frame |
//! |-------|-------|
//! | `'0'` | data: 4 ASCII digit length, then that many bytes |
//! | `'1'` | product header: 256 bytes, ignored |
//! | `'2'` | tail: the reassembled bulletin is complete |
//! | `'3'` | uncompressed data: not supported |
//! | `'4'` | abort: drop what has been reassembled |
//!
//! The reassembled bulletin is `header RS body`, handled by the same header
//! check and body conversion as the direct transport.

use tracing::debug;

use crate::error::{MessageError, NoaaportError, Result};
use crate::message::{DcpConverter, ParseStats, ParserConfig};
use crate::record::{DcpRecord, MIN_BODY_LEN};
use crate::header::MAX_HEADER_LEN;
use crate::wmo::{HEADER_END, MAX_BODY_LEN};

pub const FLAG_DATA: u8 = b'0';
pub const FLAG_HEADER: u8 = b'1';
pub const FLAG_TAIL: u8 = b'2';
pub const FLAG_UNCOMPRESSED: u8 = b'3';
pub const FLAG_ABORT: u8 = b'4';

/// Header frame size, method byte included.
pub const HEADER_FRAME_LEN: usize = 256;

/// Number of ASCII digits in a data frame length.
pub const FRAME_SIZE_DIGITS: u8 = 4;

/// Largest reassembled bulletin: a full header, the delimiter, a full body.
pub const MAX_REASSEMBLY_LEN: usize = MAX_HEADER_LEN + 1 + MAX_BODY_LEN;

/// Where the parser is within the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PdiState {
    StartFlag,
    FrameSize,
    DataFrame,
    MethodFlag,
    HeaderString,
}

/// Byte-at-a-time parser for the PDI transport.
#[derive(Debug)]
pub struct PdiFrameParser {
    converter: DcpConverter,
    state: PdiState,
    digits: u8,
    frame_len: usize,
    frame: Vec<u8>,
    header_remaining: usize,
    message: Vec<u8>,
    /// Set after a reassembly overflow; frames are dropped until tail or abort.
    discarding: bool,
}

impl PdiFrameParser {
    /// PDI never carries sequence numbers; `config.sequenced` is ignored.
    pub fn new(config: ParserConfig) -> Self {
        Self {
            converter: DcpConverter::new(config),
            state: PdiState::StartFlag,
            digits: 0,
            frame_len: 0,
            frame: Vec::new(),
            header_remaining: 0,
            message: Vec::new(),
            discarding: false,
        }
    }

    /// Current framing state.
    pub fn state(&self) -> PdiState {
        self.state
    }

    /// Message tallies since this parser was created.
    pub fn stats(&self) -> ParseStats {
        self.converter.stats()
    }

    /// Consume one byte.
    ///
    /// Returns a record when a tail frame completes a valid message, and an
    /// error for frame types that end the connection.
    pub fn feed(&mut self, byte: u8) -> Result<Option<DcpRecord>> {
        match self.state {
            PdiState::StartFlag => return self.flag_byte(byte),
            PdiState::FrameSize => self.size_byte(byte),
            PdiState::DataFrame => {
                self.frame.push(byte);
                if self.frame.len() == self.frame_len {
                    self.end_frame();
                }
            }
            PdiState::MethodFlag => {
                self.header_remaining = HEADER_FRAME_LEN - 1;
                self.state = PdiState::HeaderString;
            }
            PdiState::HeaderString => {
                self.header_remaining -= 1;
                if self.header_remaining == 0 {
                    self.state = PdiState::StartFlag;
                }
            }
        }
        Ok(None)
    }

    /// Feed a slice, collecting every completed record. Stops at the first
    /// fatal frame.
    pub fn feed_all(&mut self, bytes: &[u8]) -> Result<Vec<DcpRecord>> {
        let mut records = Vec::new();
        for &b in bytes {
            if let Some(rec) = self.feed(b)? {
                records.push(rec);
            }
        }
        Ok(records)
    }

    fn flag_byte(&mut self, byte: u8) -> Result<Option<DcpRecord>> {
        match byte {
            FLAG_DATA => {
                self.digits = 0;
                self.frame_len = 0;
                self.state = PdiState::FrameSize;
            }
            FLAG_HEADER => self.state = PdiState::MethodFlag,
            FLAG_TAIL => return Ok(self.complete()),
            FLAG_UNCOMPRESSED => return Err(NoaaportError::UncompressedFrame),
            FLAG_ABORT => {
                debug!(discarded = self.message.len(), "PDI abort frame");
                self.message.clear();
                self.discarding = false;
            }
            other => return Err(NoaaportError::InvalidFrameFlag(other)),
        }
        Ok(None)
    }

    fn size_byte(&mut self, byte: u8) {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b' ' if self.digits == 0 => 0,
            other => {
                self.message.clear();
                self.state = PdiState::StartFlag;
                self.converter.reject(MessageError::BadFrameSize(other));
                return;
            }
        };
        self.frame_len = self.frame_len * 10 + digit as usize;
        self.digits += 1;
        if self.digits == FRAME_SIZE_DIGITS {
            if self.frame_len == 0 {
                self.state = PdiState::StartFlag;
            } else {
                self.frame = Vec::with_capacity(self.frame_len);
                self.state = PdiState::DataFrame;
            }
        }
    }

    fn end_frame(&mut self) {
        self.state = PdiState::StartFlag;
        if self.discarding {
            self.frame.clear();
            return;
        }
        if self.message.len() + self.frame.len() > MAX_REASSEMBLY_LEN {
            self.message.clear();
            self.frame.clear();
            self.discarding = true;
            self.converter
                .reject(MessageError::BodyOverflow(MAX_BODY_LEN));
            return;
        }
        self.message.append(&mut self.frame);
    }

    /// Split the reassembled bulletin at the header delimiter and convert it.
    fn complete(&mut self) -> Option<DcpRecord> {
        let message = std::mem::take(&mut self.message);
        if std::mem::take(&mut self.discarding) {
            return None;
        }
        let Some(split) = message.iter().position(|&b| b == HEADER_END) else {
            self.converter.reject(MessageError::MissingHeaderDelimiter);
            return None;
        };

        let header = trim_start(&message[..split]);
        if header.len() >= MAX_HEADER_LEN {
            self.converter
                .reject(MessageError::HeaderOverflow(MAX_HEADER_LEN));
            return None;
        }
        if !self.converter.accept_header(header) {
            return None;
        }

        let body = &message[split + 1..];
        if body.len() >= MAX_BODY_LEN {
            self.converter
                .reject(MessageError::BodyOverflow(MAX_BODY_LEN));
            return None;
        }
        if body.len() < MIN_BODY_LEN {
            self.converter.reject(MessageError::TooShort {
                min: MIN_BODY_LEN,
                actual: body.len(),
            });
            return None;
        }
        self.converter.finish(body, None)
    }
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}
