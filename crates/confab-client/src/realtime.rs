//! WebSocket implementation of the [`RealtimeConnector`] port.
//!
//! Opens one connection per session with an explicit 20 second connect
//! timeout (the only explicit timeout in the system). Received text frames
//! are parsed as [`ChannelFrame`]; malformed frames are logged and ignored.
//! The read loop runs until the subscription's cancellation token fires or
//! the server closes the connection.

use confab_core::ports::{ChannelSubscription, RealtimeConnector};
use confab_types::error::ChannelError;
use confab_types::ids::ChatId;
use confab_types::wire::ChannelFrame;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use url::Url;

use std::time::Duration;

/// Connection timeout for the realtime channel.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector for the chat server's realtime endpoint
/// (e.g. `ws://localhost:4000/ws`).
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    /// Create a connector, validating the endpoint URL.
    pub fn new(url: &str) -> Result<Self, ChannelError> {
        let url = Url::parse(url).map_err(|e| ChannelError::InvalidUrl(e.to_string()))?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(ChannelError::InvalidUrl(format!(
                "url must use ws:// or wss:// scheme, got: {}",
                url.scheme()
            )));
        }
        Ok(Self { url })
    }
}

impl RealtimeConnector for WsConnector {
    async fn connect(&self, chat_id: &ChatId) -> Result<ChannelSubscription, ChannelError> {
        let (ws, _response) = timeout(CONNECT_TIMEOUT, connect_async(self.url.as_str()))
            .await
            .map_err(|_| ChannelError::Timeout)?
            .map_err(|e| ChannelError::Connect(e.to_string()))?;
        tracing::info!(chat_id = %chat_id, url = %self.url, "realtime channel connected");

        // There is no room join on the wire; frames for other sessions are
        // filtered by chat id once they reach the engine.
        let (frames_tx, frames_rx) = mpsc::channel(64);
        let token = CancellationToken::new();
        tokio::spawn(read_loop(ws, frames_tx, token.clone()));
        Ok(ChannelSubscription::new(frames_rx, token))
    }
}

async fn read_loop(ws: WsStream, frames: mpsc::Sender<ChannelFrame>, token: CancellationToken) {
    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ChannelFrame>(&text) {
                            Ok(frame) => {
                                if frames.send(frame).await.is_err() {
                                    break;
                                }
                            }
                            Err(error) => {
                                tracing::warn!(
                                    raw = %text,
                                    error = %error,
                                    "ignoring malformed realtime frame"
                                );
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(error)) => {
                        tracing::debug!(error = %error, "realtime receive error");
                        break;
                    }
                    // Binary and ping/pong protocol frames are handled by
                    // tungstenite.
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    tracing::debug!("realtime read loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_websocket_scheme() {
        let err = WsConnector::new("http://localhost:4000").unwrap_err();
        assert!(matches!(err, ChannelError::InvalidUrl(_)));
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn test_rejects_unparseable_url() {
        assert!(matches!(
            WsConnector::new("not a url"),
            Err(ChannelError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_accepts_ws_and_wss() {
        assert!(WsConnector::new("ws://localhost:4000").is_ok());
        assert!(WsConnector::new("wss://chat.example.com/ws").is_ok());
    }
}
