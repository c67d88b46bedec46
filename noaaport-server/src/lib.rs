//! NOAAPORT DCP ingest: the listening side, the receiver front end, and an
//! in-memory archive.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> noaaport_rs_server::Result<()> {
//! use std::sync::Arc;
//! use noaaport_rs_server::{MsgArchive, NoaaportConfig, NoaaportReceiver, StatusBoard};
//!
//! let config = NoaaportConfig::from_properties([
//!     ("noaaport.enable", "true"),
//!     ("noaaportReceiverType", "marta"),
//! ])?;
//! let archive = MsgArchive::default();
//! let status = StatusBoard::new();
//!
//! let receiver = NoaaportReceiver::new(config, Arc::new(archive.clone()), Arc::new(status.clone()));
//! let handle = receiver.start().await?;
//! // ...
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub(crate) mod connections;
pub mod error;
pub mod receiver;
pub mod status;

pub use archive::{Archived, MsgArchive, SequenceGenerator};
pub use config::{ConfigError, NoaaportConfig, ReceiverType};
pub use connections::ProducerInfo;
pub use error::{Result, ServerError};
pub use receiver::{NoaaportReceiver, ReceiverHandle};
pub use status::StatusBoard;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use connections::ProducerSlot;
use noaaport_rs_protocol::{LinkStatus, RecordSink, SessionConfig, StatusSink, run_session};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

/// Default idle read timeout for a connected producer.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Configuration for [`NoaaportListener`].
#[derive(Clone, Debug)]
pub struct ListenerConfig {
    /// Parser and capture settings applied to every producer connection.
    /// Default: direct framing, 30 minute idle timeout.
    pub session: SessionConfig,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig {
                idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
                ..SessionConfig::default()
            },
        }
    }
}

/// Handle for stopping a [`NoaaportListener`].
///
/// Stops the accept loop and closes the active producer connection. Stays
/// usable after [`NoaaportListener::run`] has taken the listener.
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
    slot: ProducerSlot,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }

    /// The producer currently feeding the listener, if any.
    pub fn active_producer(&self) -> Option<ProducerInfo> {
        self.slot.current()
    }
}

/// Accepts NOAAPORT producer connections, one at a time.
///
/// A newly accepted producer replaces the active one ("last writer wins").
pub struct NoaaportListener {
    listener: TcpListener,
    config: ListenerConfig,
    sink: Arc<dyn RecordSink>,
    status: Arc<dyn StatusSink>,
    slot: ProducerSlot,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NoaaportListener {
    /// Bind with default configuration.
    pub async fn bind(
        addr: &str,
        sink: Arc<dyn RecordSink>,
        status: Arc<dyn StatusSink>,
    ) -> Result<Self> {
        Self::bind_with_config(addr, ListenerConfig::default(), sink, status).await
    }

    pub async fn bind_with_config(
        addr: &str,
        config: ListenerConfig,
        sink: Arc<dyn RecordSink>,
        status: Arc<dyn StatusSink>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            warn!(addr, error = %e, "cannot bind NOAAPORT listener");
            ServerError::Bind(e)
        })?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        info!(addr, framing = ?config.session.framing, "listener bound");
        Ok(Self {
            listener,
            config,
            sink,
            status,
            slot: ProducerSlot::new(),
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(ServerError::Io)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
            slot: self.slot.clone(),
        }
    }

    /// The producer currently feeding this listener, if any.
    pub fn active_producer(&self) -> Option<ProducerInfo> {
        self.slot.current()
    }

    /// Run the accept loop until shutdown. Each producer gets its own task.
    pub async fn run(mut self) {
        self.status.set_status(LinkStatus::Listening);

        loop {
            let (stream, addr) = tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "accept error");
                            continue;
                        }
                    }
                }
                _ = self.shutdown_rx.changed() => {
                    info!("shutdown signal received, stopping accept loop");
                    break;
                }
            };

            info!(%addr, "accepted producer");
            let (id, stopped, replaced) = self.slot.activate(addr);
            if let Some(previous) = replaced {
                info!(previous = %previous.addr, %addr, "new producer replaces active connection");
            }
            self.status.set_status(LinkStatus::Connected);

            let session = self.config.session.clone();
            let sink = self.sink.clone();
            let status = self.status.clone();
            let slot = self.slot.clone();

            tokio::spawn(async move {
                let summary = run_session(stream, &session, sink.as_ref(), async move {
                    let _ = stopped.await;
                })
                .await;

                status.record_quality(summary.stats.messages, summary.stats.parse_errors);
                if slot.release(id) {
                    status.set_status(LinkStatus::Disconnected);
                }
                info!(%addr, end = ?summary.end, bytes = summary.bytes, "producer connection closed");
            });
        }

        if let Some(active) = self.slot.terminate() {
            info!(addr = %active.addr, "closing active producer");
        }
        self.status.set_status(LinkStatus::Disconnected);
    }
}
