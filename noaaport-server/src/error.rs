use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bind failed: {0}")]
    Bind(std::io::Error),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("NOAAPORT receiver is disabled")]
    Disabled,
}

pub type Result<T> = std::result::Result<T, ServerError>;
