//! Receiver configuration.
//!
//! Settings come either from serde (any format the caller likes) or from the
//! flat property names the rest of the ingest system uses.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use noaaport_rs_protocol::header::DEFAULT_OFFICE_ID;
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 18000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown receiver type: {0:?}")]
    UnknownReceiverType(String),
    #[error("invalid port: {0:?}")]
    InvalidPort(String),
    #[error("invalid boolean for {key}: {value:?}")]
    InvalidBool { key: &'static str, value: String },
    #[error("receiver type {0} requires a hostname")]
    MissingHostname(ReceiverType),
}

/// Which kind of NOAAPORT source feeds this receiver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiverType {
    /// Producer connects to us and sends direct-transport bulletins.
    #[default]
    Marta,
    /// We connect to the receiver; bulletins carry sequence numbers.
    Unisys,
    /// Producer connects to us and sends PDI frames.
    #[serde(alias = "PDI")]
    Pdi,
}

impl ReceiverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Marta => "marta",
            Self::Unisys => "unisys",
            Self::Pdi => "pdi",
        }
    }
}

impl fmt::Display for ReceiverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiverType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "marta" => Ok(Self::Marta),
            "unisys" => Ok(Self::Unisys),
            "pdi" => Ok(Self::Pdi),
            _ => Err(ConfigError::UnknownReceiverType(s.to_owned())),
        }
    }
}

/// Settings for [`NoaaportReceiver`](crate::NoaaportReceiver).
///
/// Durations are whole seconds so the struct deserializes from plain
/// numbers.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NoaaportConfig {
    /// Start the receiver at all. Default: `false`.
    pub enabled: bool,
    /// Listen port, or the remote port for `unisys`. Default: `18000`.
    pub port: u16,
    pub receiver_type: ReceiverType,
    /// Remote host for `unisys`. Ignored by listener roles.
    pub hostname: String,
    /// Only bulletins issued by this office are kept. Default: `"KWAL"`.
    pub office_id: String,
    /// Base path for raw byte capture.
    pub capture_file: Option<PathBuf>,
    /// Seconds without a byte before a connection is dropped. Default: 30 minutes.
    pub idle_timeout_secs: u64,
    /// Seconds between client connection attempts. Default: 1.
    pub retry_delay_secs: u64,
}

impl Default for NoaaportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_PORT,
            receiver_type: ReceiverType::default(),
            hostname: String::new(),
            office_id: DEFAULT_OFFICE_ID.to_owned(),
            capture_file: None,
            idle_timeout_secs: 30 * 60,
            retry_delay_secs: 1,
        }
    }
}

impl NoaaportConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Build from flat `key=value` properties. Keys match case-insensitively;
    /// unknown keys are ignored and missing ones keep their defaults.
    ///
    /// Either `noaaport.enable` or `noaaportEnabled` set to true enables the
    /// receiver.
    pub fn from_properties<'a, I>(props: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::default();
        for (key, value) in props {
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "noaaport.enable" => config.enabled |= parse_bool("noaaport.enable", value)?,
                "noaaportenabled" => config.enabled |= parse_bool("noaaportEnabled", value)?,
                "noaaportport" => {
                    config.port = value
                        .parse()
                        .map_err(|_| ConfigError::InvalidPort(value.to_owned()))?;
                }
                "noaaportreceivertype" => config.receiver_type = value.parse()?,
                "noaaporthostname" => config.hostname = value.to_owned(),
                "noaaportcapturefile" => {
                    config.capture_file = (!value.is_empty()).then(|| PathBuf::from(value));
                }
                "noaaportofficeid" if !value.is_empty() => config.office_id = value.to_owned(),
                _ => {}
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Check settings that depend on each other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.receiver_type == ReceiverType::Unisys && self.hostname.trim().is_empty() {
            return Err(ConfigError::MissingHostname(self.receiver_type));
        }
        Ok(())
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: value.to_owned(),
        }),
    }
}
