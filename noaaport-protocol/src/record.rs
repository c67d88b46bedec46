//! Canonical DOMSAT-layout DCP records and the NOAAPORT body conversion.
//!
//! A record is a 37-byte ASCII header followed by the message data:
//!
//! ```text
//! 0        8  10  13     19 20 22 24 25 26  29 30 32    37
//! AAAAAAAA YY DDD HHMMSS F  SS FF M  Q  CCC s  NP LLLLL data...
//! ```
//!
//! NOAAPORT delivers the same fields in a different order: address and time
//! up front, signal quality and channel in an 11-byte trailer.

use std::time::SystemTime;

use crate::error::MessageError;
use crate::time::{self, UtcDay};

pub const IDX_DCP_ADDR: usize = 0;
pub const IDX_YEAR: usize = 8;
pub const IDX_DAY: usize = 10;
pub const IDX_HOUR: usize = 13;
pub const IDX_FAILCODE: usize = 19;
pub const IDX_SIGSTRENGTH: usize = 20;
pub const IDX_FREQOFFSET: usize = 22;
pub const IDX_MODINDEX: usize = 24;
pub const IDX_DATAQUALITY: usize = 25;
pub const IDX_CHANNEL: usize = 26;
pub const IDX_SPACECRAFT: usize = 29;
pub const IDX_SOURCE: usize = 30;
pub const IDX_DATALENGTH: usize = 32;
pub const IDX_DATA: usize = 37;

/// Fixed header length of a canonical record.
pub const HEADER_LEN: usize = IDX_DATA;

/// Source tag stamped on every record produced from NOAAPORT.
pub const SOURCE_TAG: &[u8; 2] = b"NP";

/// Address, separator, and 9 digits of day-of-year and time.
pub const BODY_HEADER_LEN: usize = 18;

/// `SSFFMQ CCCs`: signal, frequency offset, modulation, quality, channel, spacecraft.
pub const TRAILER_LEN: usize = 11;

/// Smallest body that holds both the leading fields and the trailer.
pub const MIN_BODY_LEN: usize = BODY_HEADER_LEN + TRAILER_LEN;

/// Largest payload the 5-digit length field can describe.
pub const MAX_DATA_LEN: usize = 99_999;

/// A DCP message in canonical layout.
///
/// Equality ignores the local receive time.
#[derive(Clone, Debug)]
pub struct DcpRecord {
    data: Vec<u8>,
    transmit_time: SystemTime,
    sequence: Option<u32>,
    received: SystemTime,
}

impl DcpRecord {
    /// Wrap canonical bytes. Returns `None` if shorter than the fixed header.
    pub fn from_bytes(data: Vec<u8>, transmit_time: SystemTime) -> Option<Self> {
        if data.len() < HEADER_LEN {
            return None;
        }
        Some(Self {
            data,
            transmit_time,
            sequence: None,
            received: SystemTime::now(),
        })
    }

    /// The whole record, header and data.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Length of the whole record in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the record holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 8 hex digit DCP address.
    pub fn address(&self) -> &str {
        self.str_field(IDX_DCP_ADDR, 8)
    }

    /// Transmission start time, UTC.
    pub fn transmit_time(&self) -> SystemTime {
        self.transmit_time
    }

    /// `'G'` for a good message, `'?'` for one with parity errors.
    pub fn failure_code(&self) -> char {
        self.data[IDX_FAILCODE] as char
    }

    /// Signal strength in dBm, if the field is numeric.
    pub fn signal_strength(&self) -> Option<u32> {
        self.str_field(IDX_SIGSTRENGTH, 2).parse().ok()
    }

    /// Frequency offset in units of 50 Hz, if the field is numeric.
    pub fn frequency_offset(&self) -> Option<i32> {
        self.str_field(IDX_FREQOFFSET, 2).trim().parse().ok()
    }

    /// Modulation index character from the trailer.
    pub fn modulation_index(&self) -> char {
        self.data[IDX_MODINDEX] as char
    }

    /// Data quality character; `'N'` is normal.
    pub fn data_quality(&self) -> char {
        self.data[IDX_DATAQUALITY] as char
    }

    /// GOES channel number, 0 if unreadable.
    pub fn channel(&self) -> u16 {
        self.str_field(IDX_CHANNEL, 3).parse().unwrap_or(0)
    }

    /// `'E'` for GOES East, `'W'` for GOES West.
    pub fn spacecraft(&self) -> char {
        self.data[IDX_SPACECRAFT] as char
    }

    /// Two-character tag naming where the record came from.
    pub fn source_tag(&self) -> &str {
        self.str_field(IDX_SOURCE, 2)
    }

    /// The length declared in the header.
    pub fn data_length(&self) -> usize {
        self.str_field(IDX_DATALENGTH, 5).parse().unwrap_or(0)
    }

    /// The message data as sent by the platform.
    pub fn data(&self) -> &[u8] {
        &self.data[IDX_DATA..]
    }

    /// Sequence number, either from the transport or assigned by the archive.
    pub fn sequence(&self) -> Option<u32> {
        self.sequence
    }

    /// Assign an archive sequence number.
    pub fn set_sequence(&mut self, sequence: u32) {
        self.sequence = Some(sequence);
    }

    /// When this receiver finished reading the message.
    pub fn received(&self) -> SystemTime {
        self.received
    }

    fn str_field(&self, start: usize, len: usize) -> &str {
        std::str::from_utf8(&self.data[start..start + len]).unwrap_or("")
    }
}

impl PartialEq for DcpRecord {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
            && self.transmit_time == other.transmit_time
            && self.sequence == other.sequence
    }
}

impl Eq for DcpRecord {}

/// Convert a NOAAPORT DCP message body to a canonical record.
///
/// `body` is everything after the header delimiter; trailing whitespace is
/// ignored. `now` decides the year, since the message only carries a
/// day-of-year.
pub fn convert(
    body: &[u8],
    now: SystemTime,
    sequence: Option<u32>,
) -> Result<DcpRecord, MessageError> {
    let body = trim_end(body);
    if body.len() < MIN_BODY_LEN {
        return Err(MessageError::TooShort {
            min: MIN_BODY_LEN,
            actual: body.len(),
        });
    }

    let address = &body[..8];
    if !address.iter().all(u8::is_ascii_hexdigit) {
        return Err(MessageError::BadAddress(lossy(address)));
    }

    let stamp = &body[9..BODY_HEADER_LEN];
    if !stamp.iter().all(u8::is_ascii_digit) {
        return Err(MessageError::BadDateTime(lossy(stamp)));
    }
    let day_of_year = digits(&stamp[0..3]) as u16;
    let year = UtcDay::from_system_time(now).resolve_year(day_of_year);
    let transmit_time = time::from_day_of_year(
        year,
        day_of_year,
        digits(&stamp[3..5]),
        digits(&stamp[5..7]),
        digits(&stamp[7..9]),
    )
    .ok_or_else(|| MessageError::BadDateTime(lossy(stamp)))?;

    let trailer = &body[body.len() - TRAILER_LEN..];
    let mut channel = [trailer[7], trailer[8], trailer[9]];
    for b in &mut channel {
        if *b == b' ' {
            *b = b'0';
        }
    }
    if !channel.iter().all(u8::is_ascii_digit) {
        return Err(MessageError::BadChannel(lossy(&trailer[7..10])));
    }

    let payload = &body[BODY_HEADER_LEN..body.len() - TRAILER_LEN];
    let quality = trailer[5];
    let failcode = if quality == b'N' { b'G' } else { b'?' };

    let mut data = Vec::with_capacity(HEADER_LEN + payload.len());
    data.extend_from_slice(address);
    data.extend_from_slice(format!("{:02}", year.rem_euclid(100)).as_bytes());
    data.extend_from_slice(stamp);
    data.push(failcode);
    data.extend_from_slice(&trailer[0..2]);
    data.extend_from_slice(&trailer[2..4]);
    data.push(trailer[4]);
    data.push(quality);
    data.extend_from_slice(&channel);
    data.push(trailer[10]);
    data.extend_from_slice(SOURCE_TAG);
    data.extend_from_slice(format!("{:05}", payload.len().min(MAX_DATA_LEN)).as_bytes());
    data.extend_from_slice(payload);
    debug_assert_eq!(data.len(), HEADER_LEN + payload.len());

    Ok(DcpRecord {
        data,
        transmit_time,
        sequence,
        received: SystemTime::now(),
    })
}

fn trim_end(mut bytes: &[u8]) -> &[u8] {
    while let Some((last, rest)) = bytes.split_last() {
        if !last.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    bytes
}

fn digits(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0, |acc, b| acc * 10 + (b - b'0') as u32)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> SystemTime {
        time::from_day_of_year(2026, 291, 15, 0, 0).unwrap()
    }

    const BODY: &[u8] = b"CE40A1F2 291143000:HG 0 12.34 :TA 0 56.7 39+0NN 042E\r\n";

    #[test]
    fn convert_fields() {
        let rec = convert(BODY, now(), None).unwrap();
        assert_eq!(rec.address(), "CE40A1F2");
        assert_eq!(&rec.as_bytes()[IDX_YEAR..IDX_HOUR], b"26291");
        assert_eq!(&rec.as_bytes()[IDX_HOUR..IDX_FAILCODE], b"143000");
        assert_eq!(rec.failure_code(), 'G');
        assert_eq!(rec.signal_strength(), Some(39));
        assert_eq!(rec.frequency_offset(), Some(0));
        assert_eq!(rec.modulation_index(), 'N');
        assert_eq!(rec.data_quality(), 'N');
        assert_eq!(rec.channel(), 42);
        assert_eq!(rec.spacecraft(), 'E');
        assert_eq!(rec.source_tag(), "NP");
        assert_eq!(rec.data(), b":HG 0 12.34 :TA 0 56.7 ");
        assert_eq!(rec.data_length(), rec.data().len());
        assert_eq!(rec.len(), HEADER_LEN + rec.data().len());
        assert_eq!(rec.sequence(), None);
        assert_eq!(
            rec.transmit_time(),
            time::from_day_of_year(2026, 291, 14, 30, 0).unwrap()
        );
    }

    #[test]
    fn parity_error_sets_failcode() {
        let body = b"CE40A1F2 291143000data 39-1NP 042E";
        let rec = convert(body, now(), None).unwrap();
        assert_eq!(rec.failure_code(), '?');
        assert_eq!(rec.data_quality(), 'P');
        assert_eq!(rec.frequency_offset(), Some(-1));
    }

    #[test]
    fn channel_spaces_become_zeros() {
        let body = b"CE40A1F2 291143000data 39+0NN   7W";
        let rec = convert(body, now(), None).unwrap();
        assert_eq!(&rec.as_bytes()[IDX_CHANNEL..IDX_SPACECRAFT], b"007");
        assert_eq!(rec.spacecraft(), 'W');
    }

    #[test]
    fn minimum_body_has_empty_payload() {
        let body = b"CE40A1F2 29114300039+0NN 042E";
        assert_eq!(body.len(), MIN_BODY_LEN);
        let rec = convert(body, now(), Some(7)).unwrap();
        assert!(rec.data().is_empty());
        assert_eq!(&rec.as_bytes()[IDX_DATALENGTH..IDX_DATA], b"00000");
        assert_eq!(rec.sequence(), Some(7));
    }

    #[test]
    fn too_short_after_trim() {
        let body = b"CE40A1F2 2911430039+0NN 042E    \r\n";
        let err = convert(body, now(), None).unwrap_err();
        assert_eq!(err, MessageError::TooShort { min: 29, actual: 28 });
    }

    #[test]
    fn non_hex_address() {
        let body = b"CE40A1G2 291143000data 39+0NN 042E";
        assert!(matches!(
            convert(body, now(), None),
            Err(MessageError::BadAddress(_))
        ));
    }

    #[test]
    fn non_digit_time() {
        let body = b"CE40A1F2 29114X000data 39+0NN 042E";
        assert!(matches!(
            convert(body, now(), None),
            Err(MessageError::BadDateTime(_))
        ));
    }

    #[test]
    fn out_of_range_time() {
        let body = b"CE40A1F2 291253000data 39+0NN 042E";
        assert!(matches!(
            convert(body, now(), None),
            Err(MessageError::BadDateTime(_))
        ));
    }

    #[test]
    fn non_digit_channel() {
        let body = b"CE40A1F2 291143000data 39+0NN 0x2E";
        assert!(matches!(
            convert(body, now(), None),
            Err(MessageError::BadChannel(_))
        ));
    }

    #[test]
    fn previous_year_when_day_is_ahead() {
        let jan5 = time::from_day_of_year(2026, 5, 0, 10, 0).unwrap();
        let late = convert(b"CE40A1F2 360235959data 39+0NN 042E", jan5, None).unwrap();
        assert_eq!(&late.as_bytes()[IDX_YEAR..IDX_DAY], b"25");
        assert_eq!(
            late.transmit_time(),
            time::from_day_of_year(2025, 360, 23, 59, 59).unwrap()
        );

        let early = convert(b"CE40A1F2 003000000data 39+0NN 042E", jan5, None).unwrap();
        assert_eq!(&early.as_bytes()[IDX_YEAR..IDX_DAY], b"26");
    }

    #[test]
    fn from_bytes_requires_header() {
        assert!(DcpRecord::from_bytes(vec![b'0'; 10], SystemTime::UNIX_EPOCH).is_none());
        let rec = convert(BODY, now(), None).unwrap();
        let copy = DcpRecord::from_bytes(rec.as_bytes().to_vec(), rec.transmit_time()).unwrap();
        assert_eq!(copy.address(), rec.address());
        assert_eq!(copy.data(), rec.data());
    }
}
