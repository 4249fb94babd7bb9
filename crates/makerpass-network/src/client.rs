//! WebSocket client for the authority connection.
//!
//! One `WsClient` holds at most one socket. It does not retry, ping, or
//! interpret payloads; the transport task decides when to reconnect and the
//! controller decides when the authority has gone quiet for too long.
//!
//! # Example Usage
//!
//! ```no_run
//! use makerpass_network::{Incoming, WsClient, WsClientConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = WsClient::new(WsClientConfig {
//!     url: "ws://127.0.0.1:8080/ws".into(),
//!     timeout: Duration::from_millis(3000),
//! });
//! client.connect().await?;
//!
//! client.send_text(r#"{"type":"pong"}"#.to_string()).await?;
//! if let Incoming::Text(text) = client.recv().await? {
//!     println!("Received: {text}");
//! }
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Timeout Handling
//!
//! Connecting and sending are bounded by the configured timeout. Receiving
//! is not: silence is a normal state for this link.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for the WebSocket client
#[derive(Debug, Clone)]
pub struct WsClientConfig {
    /// `ws://` or `wss://` URL of the authority endpoint
    pub url: String,

    /// Timeout for connect and send
    pub timeout: Duration,
}

/// Errors that can occur during WebSocket client operations
#[derive(Debug, Error)]
pub enum WsClientError {
    /// Client is not connected to the authority
    #[error("Not connected to authority")]
    NotConnected,

    /// Connection attempt timed out
    #[error("Connection timeout after {0}ms")]
    ConnectionTimeout(u64),

    /// Write operation timed out
    #[error("Write timeout after {0}ms")]
    WriteTimeout(u64),

    /// WebSocket handshake or framing error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

/// Something read from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A text frame carrying an authority message.
    Text(String),

    /// A control or binary frame. Proves the peer is alive, carries nothing.
    Activity,

    /// The peer closed the connection, with its reason if it gave one.
    Closed(Option<String>),
}

/// WebSocket client for the authority link
pub struct WsClient {
    url: String,

    /// Open socket (None if not connected)
    stream: Option<WsStream>,

    timeout: Duration,
}

impl WsClient {
    /// Create a client. It is not connected until [`connect`](Self::connect).
    pub fn new(config: WsClientConfig) -> Self {
        debug!("Creating WebSocket client for {}", config.url);

        Self {
            url: config.url,
            stream: None,
            timeout: config.timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Open the socket.
    ///
    /// An already open socket is dropped first.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails or does not finish within the
    /// timeout.
    pub async fn connect(&mut self) -> Result<(), WsClientError> {
        self.stream = None;
        info!("Connecting to authority at {}", self.url);

        match tokio::time::timeout(self.timeout, connect_async(self.url.as_str())).await {
            Ok(Ok((stream, response))) => {
                debug!(status = %response.status(), "WebSocket handshake complete");
                self.stream = Some(stream);
                Ok(())
            }
            Ok(Err(e)) => {
                warn!("Connection failed: {}", e);
                Err(e.into())
            }
            Err(_) => {
                warn!("Connection timeout after {}ms", self.timeout.as_millis());
                Err(WsClientError::ConnectionTimeout(
                    self.timeout.as_millis() as u64
                ))
            }
        }
    }

    /// Send one text frame.
    ///
    /// On failure the socket is dropped; the caller should treat the
    /// connection as lost.
    ///
    /// # Errors
    ///
    /// Returns an error if not connected, if the write fails, or if it does
    /// not finish within the timeout.
    pub async fn send_text(&mut self, text: String) -> Result<(), WsClientError> {
        trace!(len = text.len(), "Sending text frame");
        let stream = self.stream.as_mut().ok_or(WsClientError::NotConnected)?;

        let send = stream.send(Message::Text(text));
        let result = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(WsClientError::WebSocket(e)),
            Err(_) => Err(WsClientError::WriteTimeout(self.timeout.as_millis() as u64)),
        };

        if result.is_err() {
            self.stream = None;
        }
        result
    }

    /// Wait for the next frame.
    ///
    /// Pings are answered by the WebSocket layer and reported as
    /// [`Incoming::Activity`]. After [`Incoming::Closed`] or an error the
    /// client is disconnected.
    ///
    /// # Errors
    ///
    /// Returns an error if not connected or if the socket fails.
    pub async fn recv(&mut self) -> Result<Incoming, WsClientError> {
        let stream = self.stream.as_mut().ok_or(WsClientError::NotConnected)?;

        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                trace!(len = text.len(), "Received text frame");
                Ok(Incoming::Text(text))
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                Ok(Incoming::Activity)
            }
            Some(Ok(Message::Binary(data))) => {
                debug!(len = data.len(), "Ignoring binary frame");
                Ok(Incoming::Activity)
            }
            Some(Ok(Message::Close(frame))) => {
                self.stream = None;
                let reason = frame
                    .map(|f| f.reason.into_owned())
                    .filter(|reason| !reason.is_empty());
                info!(reason = ?reason, "Authority closed the connection");
                Ok(Incoming::Closed(reason))
            }
            Some(Err(e)) => {
                self.stream = None;
                warn!("Connection lost: {}", e);
                Err(e.into())
            }
            None => {
                self.stream = None;
                Ok(Incoming::Closed(None))
            }
        }
    }

    /// Returns `true` while a socket is open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Close the socket with a close handshake.
    ///
    /// Idempotent. The close handshake is bounded by the timeout; the socket
    /// is dropped either way.
    ///
    /// # Errors
    ///
    /// Currently always succeeds; failures during close are logged.
    pub async fn close(&mut self) -> Result<(), WsClientError> {
        if let Some(mut stream) = self.stream.take() {
            info!("Closing connection to {}", self.url);
            match tokio::time::timeout(self.timeout, stream.close(None)).await {
                Ok(Ok(())) => debug!("Close handshake completed"),
                Ok(Err(e)) => warn!("Error during close: {}", e),
                Err(_) => warn!("Close timeout ({}ms)", self.timeout.as_millis()),
            }
        }
        Ok(())
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        if self.stream.is_some() {
            debug!("WsClient dropped while connected - connection will be closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WsClientConfig {
        WsClientConfig {
            url: "ws://127.0.0.1:9".into(),
            timeout: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_client_not_connected_initially() {
        let client = WsClient::new(config());
        assert!(!client.is_connected());
        assert_eq!(client.url(), "ws://127.0.0.1:9");
    }

    #[tokio::test]
    async fn test_send_without_connect() {
        let mut client = WsClient::new(config());
        let result = client.send_text("{}".into()).await;
        assert!(matches!(result, Err(WsClientError::NotConnected)));
    }

    #[tokio::test]
    async fn test_recv_without_connect() {
        let mut client = WsClient::new(config());
        assert!(matches!(
            client.recv().await,
            Err(WsClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let mut client = WsClient::new(WsClientConfig {
            url: "not a url".into(),
            timeout: Duration::from_millis(500),
        });
        assert!(matches!(
            client.connect().await,
            Err(WsClientError::WebSocket(_))
        ));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_multiple_close_calls() {
        let mut client = WsClient::new(config());
        client.close().await.unwrap();
        client.close().await.unwrap();
    }
}
