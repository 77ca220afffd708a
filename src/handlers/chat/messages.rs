//! Chat WebSocket message types
//!
//! This module defines all message types for the browser-facing chat
//! protocol. Each WebSocket text frame carries exactly one JSON object,
//! tagged by a `type` field.

use serde::{Deserialize, Serialize};

/// Maximum allowed size for user message content (50 KB)
pub const MAX_CONTENT_SIZE: usize = 50 * 1024;

// =============================================================================
// Incoming Messages (Client -> Server)
// =============================================================================

/// Incoming WebSocket messages from the chat client
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ChatIncomingMessage {
    /// User utterance to forward to the agent engine
    #[serde(rename = "message")]
    Message {
        /// Message text
        content: String,
    },

    /// Transport-local keepalive; answered with `pong`, never forwarded
    #[serde(rename = "ping")]
    Ping,
}

// =============================================================================
// Outgoing Messages (Server -> Client)
// =============================================================================

/// Outgoing WebSocket messages to the chat client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ChatOutgoingMessage {
    /// Sent once, immediately after the socket is accepted, before the
    /// upstream engine connection is ready
    #[serde(rename = "connected")]
    Connected,

    /// Keepalive reply
    #[serde(rename = "pong")]
    Pong,

    /// Incremental chunk of the in-progress assistant reply
    #[serde(rename = "text.delta")]
    TextDelta {
        /// Text chunk
        delta: String,
    },

    /// Raw full-text completion event
    #[serde(rename = "text.done")]
    TextDone {
        /// Full text
        text: String,
    },

    /// Authoritative full assistant reply for the current response
    #[serde(rename = "assistant.message")]
    AssistantMessage {
        /// Full text
        text: String,
    },

    /// The current response has finished
    #[serde(rename = "response.done")]
    ResponseDone,

    /// Error report; always sent before a for-cause teardown
    #[serde(rename = "error")]
    Error {
        /// Error detail
        error: String,
    },
}

// =============================================================================
// Validation
// =============================================================================

/// Error type for message validation failures
#[derive(Debug, Clone)]
pub enum ChatValidationError {
    /// `message` frame with an empty content string
    EmptyContent,
    /// Content exceeds maximum allowed size
    ContentTooLarge { size: usize, max: usize },
}

impl std::fmt::Display for ChatValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => {
                write!(f, "Message content must not be empty")
            }
            Self::ContentTooLarge { size, max } => {
                write!(f, "Content too large: {} bytes (max: {} bytes)", size, max)
            }
        }
    }
}

impl std::error::Error for ChatValidationError {}

impl ChatIncomingMessage {
    /// Validates message content before it is handed to the codec.
    ///
    /// An empty utterance would produce a pointless engine turn, and an
    /// oversized one risks resource exhaustion, so both are rejected here
    /// and reported to the client as recoverable errors.
    pub fn validate(&self) -> Result<(), ChatValidationError> {
        match self {
            ChatIncomingMessage::Message { content } => {
                if content.is_empty() {
                    return Err(ChatValidationError::EmptyContent);
                }
                let size = content.len();
                if size > MAX_CONTENT_SIZE {
                    return Err(ChatValidationError::ContentTooLarge {
                        size,
                        max: MAX_CONTENT_SIZE,
                    });
                }
                Ok(())
            }
            ChatIncomingMessage::Ping => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_deserialization() {
        let json = r#"{"type": "message", "content": "hello"}"#;
        let msg: ChatIncomingMessage = serde_json::from_str(json).expect("Should deserialize");
        match msg {
            ChatIncomingMessage::Message { content } => assert_eq!(content, "hello"),
            _ => panic!("Expected Message variant"),
        }
    }

    #[test]
    fn test_ping_deserialization() {
        let json = r#"{"type": "ping"}"#;
        let msg: ChatIncomingMessage = serde_json::from_str(json).expect("Should deserialize");
        assert!(matches!(msg, ChatIncomingMessage::Ping));
    }

    #[test]
    fn test_message_missing_content_fails() {
        let json = r#"{"type": "message"}"#;
        let result: Result<ChatIncomingMessage, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_type_fails() {
        let json = r#"{"type": "telepathy"}"#;
        let result: Result<ChatIncomingMessage, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_connected_serialization() {
        let json = serde_json::to_string(&ChatOutgoingMessage::Connected).expect("Should serialize");
        assert_eq!(json, r#"{"type":"connected"}"#);
    }

    #[test]
    fn test_text_delta_serialization() {
        let msg = ChatOutgoingMessage::TextDelta {
            delta: "Hi".to_string(),
        };
        let json = serde_json::to_string(&msg).expect("Should serialize");
        assert!(json.contains(r#""type":"text.delta""#));
        assert!(json.contains(r#""delta":"Hi""#));
    }

    #[test]
    fn test_assistant_message_serialization() {
        let msg = ChatOutgoingMessage::AssistantMessage {
            text: "Hi there".to_string(),
        };
        let json = serde_json::to_string(&msg).expect("Should serialize");
        assert!(json.contains(r#""type":"assistant.message""#));
        assert!(json.contains(r#""text":"Hi there""#));
    }

    #[test]
    fn test_error_serialization() {
        let msg = ChatOutgoingMessage::Error {
            error: "Invalid message format".to_string(),
        };
        let json = serde_json::to_string(&msg).expect("Should serialize");
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""error":"Invalid message format""#));
    }

    #[test]
    fn test_validation_empty_content() {
        let msg = ChatIncomingMessage::Message {
            content: String::new(),
        };
        let err = msg.validate().unwrap_err();
        assert!(matches!(err, ChatValidationError::EmptyContent));
    }

    #[test]
    fn test_validation_content_within_limit() {
        let msg = ChatIncomingMessage::Message {
            content: "a".repeat(MAX_CONTENT_SIZE),
        };
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn test_validation_content_exceeds_limit() {
        let msg = ChatIncomingMessage::Message {
            content: "a".repeat(MAX_CONTENT_SIZE + 1),
        };
        let err = msg.validate().unwrap_err();
        match err {
            ChatValidationError::ContentTooLarge { size, max } => {
                assert_eq!(size, MAX_CONTENT_SIZE + 1);
                assert_eq!(max, MAX_CONTENT_SIZE);
            }
            _ => panic!("Expected ContentTooLarge error"),
        }
    }

    #[test]
    fn test_validation_ping_always_ok() {
        assert!(ChatIncomingMessage::Ping.validate().is_ok());
    }
}
