//! Feed transport
//!
//! The connection manager only sees [`FeedTransport`] and [`FeedConnection`];
//! [`WebSocketTransport`] is the production implementation over Binance streams.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{error::Elapsed, timeout};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        handshake::client::{Request, Response},
        protocol::Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

use crate::error::{FeedError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Handshake = BoxFuture<
    'static,
    std::result::Result<
        std::result::Result<(WsStream, Response), tokio_tungstenite::tungstenite::Error>,
        Elapsed,
    >,
>;

/// No traffic for this long triggers a keepalive ping
const IDLE_TIMEOUT: Duration = Duration::from_secs(45);

/// Lifecycle events reported by a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// Handshake completed
    Opened,
    /// Text payload received
    Message(String),
    /// Transport failure; a `Closed` event follows
    Error(String),
    /// Connection is gone, with a human-readable reason
    Closed(String),
}

/// Factory for feed connections
pub trait FeedTransport: Send + Sync {
    /// Construct a connection to `url`.
    ///
    /// Fails only when the connection cannot even be constructed (malformed
    /// URL and the like); handshake failures are reported as events.
    fn open(&self, url: &str) -> Result<Box<dyn FeedConnection>>;
}

/// One live (or pending) feed connection
#[async_trait]
pub trait FeedConnection: Send {
    /// Wait for the next lifecycle event. After `Closed` no further events
    /// are produced.
    async fn next_event(&mut self) -> FeedEvent;

    /// Close the underlying transport if it is open
    async fn close(&mut self);
}

/// WebSocket transport for Binance depth streams
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    connect_timeout: Duration,
}

impl WebSocketTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl FeedTransport for WebSocketTransport {
    fn open(&self, url: &str) -> Result<Box<dyn FeedConnection>> {
        let request = url
            .into_client_request()
            .map_err(|e| FeedError::InvalidUrl(format!("{}: {}", url, e)))?;

        Ok(Box::new(WebSocketClient::new(request, self.connect_timeout)))
    }
}

enum ClientState {
    /// Handshake in flight. Kept in the state so that dropping a pending
    /// `next_event` call does not lose it.
    Connecting(Handshake),
    Open(WsStream),
    /// Failed; the close event has not been reported yet
    Failed(String),
    Closed,
}

/// WebSocket client for a single connection
pub struct WebSocketClient {
    state: ClientState,
}

impl WebSocketClient {
    pub fn new(request: Request, connect_timeout: Duration) -> Self {
        info!(url = %request.uri(), "Connecting to Binance WebSocket");
        let handshake = timeout(connect_timeout, connect_async(request)).boxed();
        Self {
            state: ClientState::Connecting(handshake),
        }
    }

    fn finish_handshake(
        &mut self,
        result: std::result::Result<
            std::result::Result<(WsStream, Response), tokio_tungstenite::tungstenite::Error>,
            Elapsed,
        >,
    ) -> FeedEvent {
        match result {
            Ok(Ok((stream, response))) => {
                info!(status = ?response.status(), "WebSocket connected");
                self.state = ClientState::Open(stream);
                FeedEvent::Opened
            }
            Ok(Err(e)) => {
                let reason = format!("Failed to connect: {}", e);
                self.state = ClientState::Failed(reason.clone());
                FeedEvent::Error(reason)
            }
            Err(_) => {
                let reason = FeedError::ConnectionTimeout.to_string();
                self.state = ClientState::Failed(reason.clone());
                FeedEvent::Error(reason)
            }
        }
    }

    async fn receive(&mut self) -> FeedEvent {
        loop {
            let ClientState::Open(stream) = &mut self.state else {
                return FeedEvent::Closed("Not connected".to_string());
            };

            let next = match timeout(IDLE_TIMEOUT, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!(idle_secs = IDLE_TIMEOUT.as_secs(), "No message received, sending keepalive");
                    if let Err(e) = stream.send(Message::Ping(vec![])).await {
                        let reason = format!("Keepalive failed: {}", e);
                        self.state = ClientState::Failed(reason.clone());
                        return FeedEvent::Error(reason);
                    }
                    continue;
                }
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    debug!(len = text.len(), "Received text message");
                    return FeedEvent::Message(text);
                }
                Some(Ok(Message::Binary(data))) => {
                    return FeedEvent::Message(String::from_utf8_lossy(&data).to_string());
                }
                Some(Ok(Message::Ping(data))) => {
                    debug!("Received ping, sending pong");
                    let _ = stream.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Pong(_))) => debug!("Received pong"),
                Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    warn!(frame = ?frame, "Received close frame");
                    self.state = ClientState::Closed;
                    let reason = frame
                        .map(|f| format!("{}: {}", f.code, f.reason))
                        .unwrap_or_else(|| "Connection closed".to_string());
                    return FeedEvent::Closed(reason);
                }
                Some(Err(e)) => {
                    error!(error = %e, "WebSocket error");
                    let reason = FeedError::WebSocketMessage(e.to_string()).to_string();
                    self.state = ClientState::Failed(reason.clone());
                    return FeedEvent::Error(reason);
                }
                None => {
                    warn!("WebSocket stream ended");
                    self.state = ClientState::Closed;
                    return FeedEvent::Closed("Stream ended".to_string());
                }
            }
        }
    }
}

#[async_trait]
impl FeedConnection for WebSocketClient {
    async fn next_event(&mut self) -> FeedEvent {
        match &mut self.state {
            ClientState::Connecting(handshake) => {
                let result = handshake.await;
                self.finish_handshake(result)
            }
            ClientState::Open(_) => self.receive().await,
            ClientState::Failed(_) => match std::mem::replace(&mut self.state, ClientState::Closed) {
                ClientState::Failed(reason) => FeedEvent::Closed(reason),
                _ => FeedEvent::Closed("Connection closed".to_string()),
            },
            ClientState::Closed => std::future::pending::<FeedEvent>().await,
        }
    }

    async fn close(&mut self) {
        if let ClientState::Open(mut stream) = std::mem::replace(&mut self.state, ClientState::Closed) {
            let _ = stream.close(None).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_malformed_url() {
        let transport = WebSocketTransport::new(Duration::from_secs(1));
        let result = transport.open("not a url");
        assert!(matches!(result, Err(FeedError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_refused_connection_reports_error_then_close() {
        // Port 9 (discard) on localhost is not expected to accept WebSocket handshakes
        let transport = WebSocketTransport::new(Duration::from_secs(2));
        let mut connection = transport.open("ws://127.0.0.1:9/ws/btcusdt@depth").unwrap();

        assert!(matches!(connection.next_event().await, FeedEvent::Error(_)));
        assert!(matches!(connection.next_event().await, FeedEvent::Closed(_)));
    }
}
