//! WMO product header acceptance.
//!
//! A header looks like `SXMN20 KWAL 181500`: a data designator starting with
//! `'S'`, the issuing office, then the bulletin time. Only bulletins from the
//! accepted office carry DCP messages we want.

use crate::error::MessageError;

/// Capacity of the product header buffer.
pub const MAX_HEADER_LEN: usize = 100;

/// Shortest header that can hold a designator and an office id.
pub const MIN_HEADER_LEN: usize = 11;

/// Office id of the NWS DCP bulletins (Wallops Island).
pub const DEFAULT_OFFICE_ID: &str = "KWAL";

/// Return the office id field: the second whitespace-separated token.
///
/// For a standard six-character designator this is bytes 7..11.
pub fn office_id(header: &[u8]) -> Option<&[u8]> {
    header
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
        .nth(1)
}

/// Check that `header` is a DCP bulletin issued by `accepted`.
pub fn validate(header: &[u8], accepted: &str) -> Result<(), MessageError> {
    let Some(&first) = header.first() else {
        return Err(MessageError::EmptyHeader);
    };
    if first != b'S' {
        return Err(MessageError::HeaderPrefix(first as char));
    }
    if header.len() < MIN_HEADER_LEN {
        return Err(MessageError::HeaderTooShort(header.len()));
    }
    match office_id(header) {
        Some(office) if office == accepted.as_bytes() => Ok(()),
        Some(office) => Err(MessageError::OfficeMismatch(
            String::from_utf8_lossy(office).into_owned(),
        )),
        None => Err(MessageError::OfficeMismatch(String::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_header() {
        let header = b"SXMN20 KWAL 181500\r\r\n";
        assert_eq!(office_id(header), Some(&b"KWAL"[..]));
        assert_eq!(&header[7..11], b"KWAL");
        assert!(validate(header, "KWAL").is_ok());
    }

    #[test]
    fn short_designator() {
        assert!(validate(b"SRWUS KWAL 1234567890", "KWAL").is_ok());
    }

    #[test]
    fn wrong_office() {
        let err = validate(b"SXMN20 KOUN 181500", "KWAL").unwrap_err();
        assert_eq!(err, MessageError::OfficeMismatch("KOUN".into()));
        assert!(err.is_foreign());
    }

    #[test]
    fn not_an_s_bulletin() {
        let err = validate(b"FXUS61 KWAL 181500", "KWAL").unwrap_err();
        assert_eq!(err, MessageError::HeaderPrefix('F'));
    }

    #[test]
    fn too_short() {
        assert_eq!(validate(b"", "KWAL"), Err(MessageError::EmptyHeader));
        assert_eq!(
            validate(b"SX KWAL", "KWAL"),
            Err(MessageError::HeaderTooShort(7))
        );
    }

    #[test]
    fn missing_office() {
        let err = validate(b"SXMN20KWAL181500", "KWAL").unwrap_err();
        assert_eq!(err, MessageError::OfficeMismatch(String::new()));
    }
}
