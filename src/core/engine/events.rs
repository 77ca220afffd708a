//! Agent engine WebSocket event types.
//!
//! This module defines the client and engine event types for the realtime
//! agent engine protocol. All events are JSON-encoded and sent over
//! WebSocket, tagged by a dotted `type` field.
//!
//! # Protocol Overview
//!
//! Client events (sent to engine):
//! - session.update - Bootstrap/update session configuration
//! - conversation.item.create - Add an item to the conversation
//! - response.create - Ask the engine to generate a response
//! - tool_approval.respond - Answer a pending tool-approval request
//!
//! Engine events (received from engine):
//! - session.created - Engine session established
//! - response.text.delta - Incremental response text chunk
//! - response.text.done - Authoritative full response text
//! - response.done - Response generation complete
//! - tool_approval.requested - A tool invocation awaits approval
//! - error - Error occurred
//!
//! Unrecognized event tags deserialize into [`EngineEvent::Unknown`] so the
//! codec can drop them explicitly instead of failing the whole stream.

use serde::{Deserialize, Serialize};

// =============================================================================
// Conversation Items
// =============================================================================

/// Role of a conversation participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemRole {
    /// End-user input
    User,
    /// Assistant output
    Assistant,
    /// System-level instructions
    System,
}

/// Conversation item carried by `conversation.item.create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item type (always "message" for this transport)
    #[serde(rename = "type")]
    pub item_type: String,
    /// Speaker role
    pub role: ItemRole,
    /// Content parts
    pub content: Vec<ContentPart>,
}

/// Content part within a conversation item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    /// Content type (input_text for user input)
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text content
    pub text: String,
}

impl ConversationItem {
    /// Create a user text message item.
    pub fn user_text(text: &str) -> Self {
        Self {
            item_type: "message".to_string(),
            role: ItemRole::User,
            content: vec![ContentPart {
                content_type: "input_text".to_string(),
                text: text.to_string(),
            }],
        }
    }
}

// =============================================================================
// Session Bootstrap
// =============================================================================

/// Session configuration sent to the engine right after connecting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionBootstrap {
    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Response modalities (this transport is text-only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
}

impl SessionBootstrap {
    /// Build the text-only bootstrap for a chat session.
    pub fn text_only(instructions: Option<String>) -> Self {
        Self {
            instructions,
            modalities: Some(vec!["text".to_string()]),
        }
    }
}

// =============================================================================
// Client Events (sent to engine)
// =============================================================================

/// Client events sent to the agent engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Bootstrap or update the session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionBootstrap,
    },

    /// Add an item to the conversation
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Ask the engine to generate a response
    #[serde(rename = "response.create")]
    ResponseCreate,

    /// Answer a pending tool-approval request
    #[serde(rename = "tool_approval.respond")]
    ToolApprovalRespond {
        /// Handle of the approval request being answered
        approval_id: String,
        /// Whether the tool invocation may proceed
        approve: bool,
    },
}

impl ClientEvent {
    /// Create a conversation item event carrying user text.
    pub fn user_message(text: &str) -> Self {
        ClientEvent::ConversationItemCreate {
            item: ConversationItem::user_text(text),
        }
    }
}

// =============================================================================
// Engine Events (received from engine)
// =============================================================================

/// Error detail attached to an engine `error` event.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineErrorDetail {
    /// Error message
    pub message: String,
    /// Machine-readable error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl std::fmt::Display for EngineErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Engine session information delivered by `session.created`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSessionInfo {
    /// Engine-assigned session ID
    pub id: String,
    /// Model serving the session
    #[serde(default)]
    pub model: Option<String>,
}

/// Events received from the agent engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// Engine session established
    #[serde(rename = "session.created")]
    SessionCreated {
        /// Session information
        session: EngineSessionInfo,
    },

    /// Incremental response text chunk
    #[serde(rename = "response.text.delta")]
    TextDelta {
        /// Text delta
        delta: String,
    },

    /// Authoritative full response text
    #[serde(rename = "response.text.done")]
    TextDone {
        /// Full text
        text: String,
    },

    /// Response generation complete
    #[serde(rename = "response.done")]
    ResponseDone,

    /// A tool invocation awaits approval
    #[serde(rename = "tool_approval.requested")]
    ToolApprovalRequested {
        /// Name of the tool being invoked
        tool_name: String,
        /// Handle to answer with
        approval_id: String,
    },

    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: EngineErrorDetail,
    },

    /// Any event tag this gateway does not recognize.
    /// Dropped by the codec; never forwarded to the client.
    #[serde(other)]
    Unknown,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_serialization() {
        let event = ClientEvent::user_message("hello");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("conversation.item.create"));
        assert!(json.contains(r#""role":"user""#));
        assert!(json.contains(r#""text":"hello""#));
        assert!(json.contains(r#""type":"input_text""#));
    }

    #[test]
    fn test_response_create_serialization() {
        let event = ClientEvent::ResponseCreate;
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("response.create"));
    }

    #[test]
    fn test_tool_approval_respond_serialization() {
        let event = ClientEvent::ToolApprovalRespond {
            approval_id: "appr_42".to_string(),
            approve: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("tool_approval.respond"));
        assert!(json.contains(r#""approval_id":"appr_42""#));
        assert!(json.contains(r#""approve":true"#));
    }

    #[test]
    fn test_session_update_serialization() {
        let event = ClientEvent::SessionUpdate {
            session: SessionBootstrap::text_only(Some("Be helpful".to_string())),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("session.update"));
        assert!(json.contains("Be helpful"));
        assert!(json.contains(r#""modalities":["text"]"#));
    }

    #[test]
    fn test_text_delta_deserialization() {
        let json = r#"{"type": "response.text.delta", "delta": "Hi"}"#;
        let event: EngineEvent = serde_json::from_str(json).unwrap();
        match event {
            EngineEvent::TextDelta { delta } => assert_eq!(delta, "Hi"),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_text_delta_ignores_extra_fields() {
        let json = r#"{"type": "response.text.delta", "delta": "Hi", "response_id": "resp_1"}"#;
        let event: EngineEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, EngineEvent::TextDelta { .. }));
    }

    #[test]
    fn test_error_event_deserialization() {
        let json = r#"{
            "type": "error",
            "error": {"message": "Test error", "code": "invalid_request"}
        }"#;
        let event: EngineEvent = serde_json::from_str(json).unwrap();
        match event {
            EngineEvent::Error { error } => {
                assert_eq!(error.message, "Test error");
                assert_eq!(error.to_string(), "invalid_request: Test error");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_tool_approval_requested_deserialization() {
        let json = r#"{
            "type": "tool_approval.requested",
            "tool_name": "weather_lookup",
            "approval_id": "appr_7"
        }"#;
        let event: EngineEvent = serde_json::from_str(json).unwrap();
        match event {
            EngineEvent::ToolApprovalRequested {
                tool_name,
                approval_id,
            } => {
                assert_eq!(tool_name, "weather_lookup");
                assert_eq!(approval_id, "appr_7");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_unknown_event_tag_falls_through() {
        let json = r#"{"type": "rate_limits.updated", "rate_limits": []}"#;
        let event: EngineEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, EngineEvent::Unknown));
    }

    #[test]
    fn test_session_created_deserialization() {
        let json = r#"{
            "type": "session.created",
            "session": {"id": "sess_1", "model": "gpt-4o-realtime-preview"}
        }"#;
        let event: EngineEvent = serde_json::from_str(json).unwrap();
        match event {
            EngineEvent::SessionCreated { session } => {
                assert_eq!(session.id, "sess_1");
                assert_eq!(session.model.as_deref(), Some("gpt-4o-realtime-preview"));
            }
            _ => panic!("Wrong event type"),
        }
    }
}
