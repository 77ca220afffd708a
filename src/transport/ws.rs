//! WebSocket client connection.
//!
//! Wraps one accepted axum WebSocket behind the [`ClientConnection`] trait.
//! Text frames carry the JSON wire protocol; binary frames have no meaning
//! on the chat transport and are dropped.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use tracing::debug;
use uuid::Uuid;

use super::{ClientConnection, TransportError, TransportResult};
use crate::handlers::chat::messages::ChatOutgoingMessage;

/// Client connection over an accepted WebSocket.
pub struct WsClientConnection {
    id: Uuid,
    socket: WebSocket,
    closed: bool,
}

impl WsClientConnection {
    /// Wrap an accepted socket, assigning it a connection id.
    pub fn new(socket: WebSocket) -> Self {
        Self {
            id: Uuid::new_v4(),
            socket,
            closed: false,
        }
    }
}

#[async_trait]
impl ClientConnection for WsClientConnection {
    fn id(&self) -> Uuid {
        self.id
    }

    async fn send(&mut self, frame: ChatOutgoingMessage) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let json = serde_json::to_string(&frame)
            .map_err(|e| TransportError::Serialization(e.to_string()))?;
        self.socket
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| TransportError::Socket(e.to_string()))
    }

    async fn recv(&mut self) -> Option<TransportResult<String>> {
        loop {
            match self.socket.recv().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Binary(data)) => {
                    debug!(bytes = data.len(), "Dropping binary frame on chat transport");
                }
                // Pings are answered by the WebSocket layer itself
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => return None,
                Err(e) => return Some(Err(TransportError::Socket(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> TransportResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // Best effort: the peer may already be gone
        let _ = self.socket.send(Message::Close(None)).await;
        Ok(())
    }
}
