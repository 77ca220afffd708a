//! Base trait and types for agent engine connections.
//!
//! This module defines the abstraction the session layer consumes: a
//! connect/send/stream/close handle over one upstream engine session.
//! Engine-originated events are delivered through an owned mpsc receiver
//! rather than registered callbacks, so each session drains its own event
//! queue from its own dispatch loop and no handler runs on shared state.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

use super::events::{ClientEvent, EngineEvent};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while talking to the agent engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Connection to the engine failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,

    /// Connection already closed
    #[error("Connection closed")]
    Closed,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for one engine session.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// WebSocket endpoint of the engine (ws:// or wss://)
    pub url: String,

    /// API key for bearer-token authentication
    pub api_key: String,

    /// Model serving the session
    pub model: String,

    /// System instructions sent in the session bootstrap
    pub instructions: Option<String>,
}

// =============================================================================
// Connection State
// =============================================================================

/// Connection state of an engine handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected to the engine
    #[default]
    Disconnected,
    /// Currently connecting
    Connecting,
    /// Connected and ready
    Connected,
    /// Connection failed
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// Base Trait
// =============================================================================

/// Handle over one upstream agent engine session.
///
/// Exactly one session owns each handle; the handle never outlives its
/// session and is never shared or pooled. `close` is idempotent so that
/// redundant teardown triggers are harmless.
#[async_trait]
pub trait AgentEngine: Send {
    /// Connect to the engine. The caller bounds this with a timeout.
    async fn connect(&mut self) -> EngineResult<()>;

    /// Take the engine event stream. Returns `None` if already taken or
    /// not connected. Dropping of the sender side (engine disconnect)
    /// ends the stream.
    fn take_events(&mut self) -> Option<mpsc::Receiver<EngineEvent>>;

    /// Send an event to the engine.
    async fn send_event(&mut self, event: ClientEvent) -> EngineResult<()>;

    /// Close the connection. Idempotent.
    async fn close(&mut self) -> EngineResult<()>;

    /// Check whether the handle is connected and ready.
    fn is_ready(&self) -> bool;

    /// Get the current connection state.
    fn connection_state(&self) -> ConnectionState;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(ConnectionState::Disconnected.to_string(), "Disconnected");
        assert_eq!(ConnectionState::Connecting.to_string(), "Connecting");
        assert_eq!(ConnectionState::Failed.to_string(), "Failed");
    }

    #[test]
    fn test_default_connection_state() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.url.is_empty());
        assert!(config.api_key.is_empty());
        assert!(config.instructions.is_none());
    }

    #[test]
    fn test_error_display() {
        let err = EngineError::ConnectionFailed("test".to_string());
        assert!(err.to_string().contains("Connection failed"));

        let err = EngineError::NotConnected;
        assert_eq!(err.to_string(), "Not connected");
    }
}
