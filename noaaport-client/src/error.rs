use std::time::Duration;

/// Errors from a single connection attempt.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// TCP or socket I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connect did not complete in time.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

/// Convenience alias for `Result<T, ClientError>`.
pub type Result<T> = std::result::Result<T, ClientError>;
