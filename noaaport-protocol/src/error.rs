use std::time::Duration;

/// Fatal, connection-level errors. Any of these ends the current session.
#[derive(Debug, thiserror::Error)]
pub enum NoaaportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("uncompressed PDI frames are not supported")]
    UncompressedFrame,

    #[error("invalid PDI frame flag: {0:#04x}")]
    InvalidFrameFlag(u8),

    #[error("no data for {0:?}")]
    IdleTimeout(Duration),
}

pub type Result<T> = std::result::Result<T, NoaaportError>;

/// Why a single message was dropped.
///
/// These never end a connection; the parser logs them and resumes hunting.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("empty product header")]
    EmptyHeader,

    #[error("product header starts with {0:?}, not 'S'")]
    HeaderPrefix(char),

    #[error("product header too short: {0} bytes")]
    HeaderTooShort(usize),

    #[error("office id {0:?} not accepted")]
    OfficeMismatch(String),

    #[error("product header exceeds {0} bytes")]
    HeaderOverflow(usize),

    #[error("message body exceeds {0} bytes")]
    BodyOverflow(usize),

    #[error("invalid byte {0:#04x} in sequence number")]
    BadSequence(u8),

    #[error("invalid byte {0:#04x} in PDI frame size")]
    BadFrameSize(u8),

    #[error("no header delimiter in reassembled message")]
    MissingHeaderDelimiter,

    #[error("message too short: expected at least {min}, actual {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("invalid DCP address {0:?}")]
    BadAddress(String),

    #[error("invalid date/time field {0:?}")]
    BadDateTime(String),

    #[error("invalid channel {0:?}")]
    BadChannel(String),
}

impl MessageError {
    /// True for bulletins that are well formed but not addressed to us.
    ///
    /// These are counted separately and are not parse errors.
    pub fn is_foreign(&self) -> bool {
        matches!(
            self,
            Self::EmptyHeader
                | Self::HeaderPrefix(_)
                | Self::HeaderTooShort(_)
                | Self::OfficeMismatch(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_classification() {
        assert!(MessageError::OfficeMismatch("KOUN".into()).is_foreign());
        assert!(MessageError::HeaderPrefix('F').is_foreign());
        assert!(!MessageError::BodyOverflow(20_000).is_foreign());
        assert!(!MessageError::TooShort { min: 29, actual: 3 }.is_foreign());
    }

    #[test]
    fn display_flag() {
        let err = NoaaportError::InvalidFrameFlag(0x41);
        assert_eq!(err.to_string(), "invalid PDI frame flag: 0x41");
    }
}
