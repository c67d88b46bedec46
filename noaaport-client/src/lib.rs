//! Reconnecting NOAAPORT client.
//!
//! Some receivers (Unisys) serve the DCP stream and expect the ingest side
//! to connect. [`ReconnectingClient`] dials the receiver, parses whatever
//! arrives, and dials again whenever the link drops.

pub(crate) mod connection;
pub mod error;
#[cfg(test)]
pub(crate) mod mock;
pub mod reconnect;

pub use error::{ClientError, Result};
pub use reconnect::{ReconnectConfig, ReconnectingClient, ShutdownHandle};
