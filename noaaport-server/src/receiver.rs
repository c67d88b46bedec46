//! Starts the connection role that matches the configured receiver type.

use std::net::SocketAddr;
use std::sync::Arc;

use noaaport_rs_client::{ReconnectConfig, ReconnectingClient};
use noaaport_rs_protocol::{Framing, ParserConfig, RecordSink, SessionConfig, StatusSink};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{NoaaportConfig, ReceiverType};
use crate::error::{Result, ServerError};
use crate::{ListenerConfig, NoaaportListener, ShutdownHandle};

/// The NOAAPORT ingest front end.
///
/// | receiver type | role | framing | sequence numbers |
/// |---|---|---|---|
/// | `marta` | listener | direct | no |
/// | `unisys` | client | direct | yes |
/// | `pdi` | listener | PDI | no |
pub struct NoaaportReceiver {
    config: NoaaportConfig,
    sink: Arc<dyn RecordSink>,
    status: Arc<dyn StatusSink>,
}

enum Stopper {
    Listener(ShutdownHandle),
    Client(noaaport_rs_client::ShutdownHandle),
}

/// A running receiver. Dropping it leaves the receiver running.
pub struct ReceiverHandle {
    receiver_type: ReceiverType,
    local_addr: Option<SocketAddr>,
    stopper: Stopper,
    task: JoinHandle<()>,
}

impl NoaaportReceiver {
    pub fn new(
        config: NoaaportConfig,
        sink: Arc<dyn RecordSink>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            config,
            sink,
            status,
        }
    }

    pub fn config(&self) -> &NoaaportConfig {
        &self.config
    }

    /// Session settings for this receiver type.
    pub fn session_config(&self) -> SessionConfig {
        let framing = match self.config.receiver_type {
            ReceiverType::Pdi => Framing::Pdi,
            ReceiverType::Marta | ReceiverType::Unisys => Framing::Direct,
        };
        SessionConfig {
            framing,
            parser: ParserConfig {
                office_id: self.config.office_id.clone(),
                sequenced: self.config.receiver_type == ReceiverType::Unisys,
                ..ParserConfig::default()
            },
            capture_file: self.config.capture_file.clone(),
            idle_timeout: Some(self.config.idle_timeout()),
        }
    }

    /// Validate the configuration and spawn the listener or client task.
    pub async fn start(self) -> Result<ReceiverHandle> {
        if !self.config.enabled {
            return Err(ServerError::Disabled);
        }
        self.config.validate()?;
        let receiver_type = self.config.receiver_type;
        let session = self.session_config();

        match receiver_type {
            ReceiverType::Marta | ReceiverType::Pdi => {
                let addr = format!("0.0.0.0:{}", self.config.port);
                let listener = NoaaportListener::bind_with_config(
                    &addr,
                    ListenerConfig { session },
                    self.sink,
                    self.status,
                )
                .await?;
                let local_addr = listener.local_addr()?;
                let stopper = Stopper::Listener(listener.shutdown_handle());
                info!(%receiver_type, %local_addr, "NOAAPORT receiver listening");
                Ok(ReceiverHandle {
                    receiver_type,
                    local_addr: Some(local_addr),
                    stopper,
                    task: tokio::spawn(listener.run()),
                })
            }
            ReceiverType::Unisys => {
                let addr = format!("{}:{}", self.config.hostname.trim(), self.config.port);
                let reconnect = ReconnectConfig {
                    retry_delay: self.config.retry_delay(),
                    ..ReconnectConfig::default()
                };
                let client =
                    ReconnectingClient::with_config(&addr, session, reconnect, self.sink, self.status);
                let stopper = Stopper::Client(client.shutdown_handle());
                info!(%receiver_type, %addr, "NOAAPORT receiver connecting");
                Ok(ReceiverHandle {
                    receiver_type,
                    local_addr: None,
                    stopper,
                    task: tokio::spawn(client.run()),
                })
            }
        }
    }
}

impl ReceiverHandle {
    pub fn receiver_type(&self) -> ReceiverType {
        self.receiver_type
    }

    /// Bound address for listener roles.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stop the receiver and wait for its task to finish.
    pub async fn shutdown(self) {
        match &self.stopper {
            Stopper::Listener(handle) => handle.shutdown(),
            Stopper::Client(handle) => handle.shutdown(),
        }
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "receiver task ended abnormally");
        }
        info!(receiver_type = %self.receiver_type, "NOAAPORT receiver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MsgArchive, StatusBoard};
    use noaaport_rs_protocol::LinkStatus;

    fn receiver(props: &[(&str, &str)]) -> NoaaportReceiver {
        let config = NoaaportConfig::from_properties(props.iter().copied()).unwrap();
        NoaaportReceiver::new(config, Arc::new(MsgArchive::new(10)), Arc::new(()))
    }

    #[test]
    fn session_per_receiver_type() {
        let marta = receiver(&[]).session_config();
        assert_eq!(marta.framing, Framing::Direct);
        assert!(!marta.parser.sequenced);
        assert_eq!(marta.idle_timeout, Some(std::time::Duration::from_secs(1800)));

        let pdi = receiver(&[("noaaportReceiverType", "PDI")]).session_config();
        assert_eq!(pdi.framing, Framing::Pdi);
        assert!(!pdi.parser.sequenced);

        let unisys = receiver(&[
            ("noaaportReceiverType", "unisys"),
            ("noaaportHostname", "np.example.net"),
            ("noaaportOfficeId", "KNES"),
        ])
        .session_config();
        assert_eq!(unisys.framing, Framing::Direct);
        assert!(unisys.parser.sequenced);
        assert_eq!(unisys.parser.office_id, "KNES");
    }

    #[tokio::test]
    async fn disabled_receiver_does_not_start() {
        let result = receiver(&[]).start().await;
        assert!(matches!(result, Err(ServerError::Disabled)));
    }

    #[tokio::test]
    async fn marta_listens_and_stops() {
        let status = StatusBoard::new();
        let config = NoaaportConfig {
            enabled: true,
            port: 0,
            ..NoaaportConfig::default()
        };
        let handle = NoaaportReceiver::new(config, Arc::new(MsgArchive::new(10)), Arc::new(status.clone()))
            .start()
            .await
            .unwrap();
        assert_eq!(handle.receiver_type(), ReceiverType::Marta);
        assert!(handle.local_addr().is_some_and(|a| a.port() != 0));

        let mut watch = status.watch();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            watch.wait_for(|s| *s == LinkStatus::Listening),
        )
        .await
        .unwrap()
        .unwrap();

        handle.shutdown().await;
        assert_eq!(status.status(), LinkStatus::Disconnected);
    }
}
