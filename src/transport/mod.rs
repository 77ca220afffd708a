//! Client connection transports.
//!
//! A [`ClientConnection`] wraps one inbound client socket. The chat
//! transport ships the WebSocket implementation; a voice/telephony
//! transport would provide a second implementation of the same trait.

pub mod ws;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::handlers::chat::messages::ChatOutgoingMessage;

/// Errors that can occur on a client connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to serialize an outgoing frame
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Underlying socket error
    #[error("Socket error: {0}")]
    Socket(String),

    /// Connection already closed
    #[error("Connection closed")]
    Closed,
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Handle over one inbound client connection.
///
/// Exactly one session owns each connection; it is never shared or reused
/// across sessions. `close` is idempotent.
#[async_trait]
pub trait ClientConnection: Send {
    /// Stable identifier of this connection, assigned at accept time.
    fn id(&self) -> Uuid;

    /// Send one wire frame to the client.
    async fn send(&mut self, frame: ChatOutgoingMessage) -> TransportResult<()>;

    /// Receive the next raw text payload from the client.
    ///
    /// Returns `None` once the peer has closed the connection. Transport
    /// control frames are handled internally and never surface here.
    async fn recv(&mut self) -> Option<TransportResult<String>>;

    /// Close the connection. Idempotent.
    async fn close(&mut self) -> TransportResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Closed;
        assert_eq!(err.to_string(), "Connection closed");

        let err = TransportError::Socket("reset by peer".to_string());
        assert!(err.to_string().contains("reset by peer"));
    }
}
