use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Open a TCP connection to the receiver within `connect_timeout`.
pub(crate) async fn connect(addr: &str, connect_timeout: Duration) -> Result<TcpStream> {
    debug!(addr, "TCP connecting");
    let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ClientError::Timeout(connect_timeout))?
        .map_err(ClientError::Io)?;

    stream.set_nodelay(true).ok();
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connects_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let (client, accepted) = tokio::join!(connect(&addr, Duration::from_secs(5)), async {
            listener.accept().await.unwrap()
        });
        let client = client.unwrap();
        assert_eq!(client.peer_addr().unwrap(), accepted.0.local_addr().unwrap());
    }

    #[tokio::test]
    async fn connect_timeout() {
        // Non-routable address; hosts without a route fail fast instead.
        let result = connect("192.0.2.1:18000", Duration::from_millis(50)).await;
        assert!(matches!(
            result,
            Err(ClientError::Timeout(_)) | Err(ClientError::Io(_))
        ));
    }

    #[tokio::test]
    async fn connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = connect(&addr, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(ClientError::Io(_))));
    }
}
