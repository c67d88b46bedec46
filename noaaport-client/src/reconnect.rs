use std::sync::Arc;
use std::time::Duration;

use noaaport_rs_protocol::{LinkStatus, RecordSink, SessionConfig, StatusSink, run_session};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::connection;

/// Retry behaviour for [`ReconnectingClient`].
#[derive(Clone, Debug)]
pub struct ReconnectConfig {
    /// Fixed delay between connection attempts. Default: 1 second.
    pub retry_delay: Duration,
    /// Timeout for each TCP connect. Default: 10 seconds.
    pub connect_timeout: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Handle for stopping a running [`ReconnectingClient`].
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Close the current connection and stop retrying.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Connects to a NOAAPORT receiver and keeps reconnecting until shut down.
///
/// Every connection runs the direct-transport parser with sequence numbers
/// enabled: receivers that serve the stream number each message.
pub struct ReconnectingClient {
    addr: String,
    session: SessionConfig,
    reconnect: ReconnectConfig,
    sink: Arc<dyn RecordSink>,
    status: Arc<dyn StatusSink>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl ReconnectingClient {
    /// Create a client for `addr` (`host:port`) with default retry settings.
    pub fn new(
        addr: &str,
        session: SessionConfig,
        sink: Arc<dyn RecordSink>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self::with_config(addr, session, ReconnectConfig::default(), sink, status)
    }

    pub fn with_config(
        addr: &str,
        mut session: SessionConfig,
        reconnect: ReconnectConfig,
        sink: Arc<dyn RecordSink>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        session.parser.sequenced = true;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            addr: addr.to_owned(),
            session,
            reconnect,
            sink,
            status,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Connect, parse, and reconnect until shutdown.
    pub async fn run(mut self) {
        let mut attempt: u64 = 0;

        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            attempt += 1;
            self.status.set_status(LinkStatus::Connecting);
            let connected = tokio::select! {
                result = connection::connect(&self.addr, self.reconnect.connect_timeout) => result,
                _ = self.shutdown_rx.changed() => break,
            };

            match connected {
                Ok(stream) => {
                    info!(addr = %self.addr, attempt, "connected");
                    attempt = 0;
                    self.status.set_status(LinkStatus::Connected);

                    let mut stop = self.shutdown_rx.clone();
                    let summary = run_session(stream, &self.session, self.sink.as_ref(), async move {
                        let _ = stop.wait_for(|stopped| *stopped).await;
                    })
                    .await;

                    self.status
                        .record_quality(summary.stats.messages, summary.stats.parse_errors);
                    self.status.set_status(LinkStatus::Disconnected);
                    if summary.stopped() {
                        break;
                    }
                    info!(addr = %self.addr, end = ?summary.end, "connection lost, reconnecting");
                }
                Err(e) => {
                    warn!(addr = %self.addr, attempt, error = %e, "connect failed");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.reconnect.retry_delay) => {}
                _ = self.shutdown_rx.wait_for(|stopped| *stopped) => break,
            }
        }

        self.status.set_status(LinkStatus::Disconnected);
        info!(addr = %self.addr, "client stopped");
    }
}
