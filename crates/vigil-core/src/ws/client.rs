//! WebSocket connection establishment.
//!
//! The reconnect loop lives in the feed manager; this module only knows how
//! to open one connection. [`Connector`] abstracts that step so the manager
//! can be driven by an in-memory script in tests.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, Stream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::VigilError;

/// A live TLS WebSocket stream.
pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Opens one duplex message connection to a URL.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The connection: a stream of inbound frames and a sink for outbound ones.
    type Conn: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin + Send + 'static;

    async fn connect(&self, url: &str) -> Result<Self::Conn, VigilError>;
}

/// Real connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    /// Upper bound on TCP + TLS + upgrade.
    pub connect_timeout: Duration,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self { connect_timeout: Duration::from_secs(10) }
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Conn = WsStream;

    async fn connect(&self, url: &str) -> Result<WsStream, VigilError> {
        let request = url.into_client_request()?;

        debug!("connecting to {} ({})", url, extract_host(url));
        let (stream, _response) = tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(request))
            .await
            .map_err(|_| VigilError::Timeout(format!("connect to {url}")))??;
        Ok(stream)
    }
}

/// Extract the host from a URL string.
fn extract_host(url: &str) -> String {
    url::Url::parse(url).map(|u| u.host_str().unwrap_or("").to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_extraction() {
        assert_eq!(extract_host("wss://fstream.binance.com/ws"), "fstream.binance.com");
        assert_eq!(extract_host("not a url"), "");
    }
}
