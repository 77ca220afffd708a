//! Protocol codec between the chat wire protocol and the engine protocol.
//!
//! Pure translation, no I/O. The only state any function touches is the
//! per-session accumulator passed in by the caller, which reconstructs the
//! in-progress assistant reply from incremental deltas.
//!
//! Direction 1 (client -> engine): a decoded `message` frame expands to
//! exactly two engine events, `conversation.item.create` then
//! `response.create`, in that order. The session's dispatch loop guarantees
//! the pair is never interleaved with another message's pair.
//!
//! Direction 2 (engine -> client): deltas are appended to the accumulator
//! and forwarded; the done event carries the authoritative full text and
//! overwrites whatever the deltas accumulated; unrecognized engine events
//! are dropped here, explicitly.

use thiserror::Error;

use crate::core::engine::{ClientEvent, EngineEvent};
use crate::handlers::chat::messages::{ChatIncomingMessage, ChatOutgoingMessage};

/// Error decoding a client wire frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Frame was not a JSON object of a known message shape
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// Decode one raw client text frame into a wire message.
pub fn decode_client_frame(raw: &str) -> Result<ChatIncomingMessage, DecodeError> {
    serde_json::from_str(raw).map_err(|e| DecodeError::MalformedPayload(e.to_string()))
}

/// Translate a validated client message into engine events.
///
/// `ping` produces no engine traffic at all; the keepalive is answered
/// locally by the session. A user message produces the item-create /
/// response-create pair.
pub fn encode_engine_request(msg: &ChatIncomingMessage) -> Vec<ClientEvent> {
    match msg {
        ChatIncomingMessage::Ping => Vec::new(),
        ChatIncomingMessage::Message { content } => vec![
            ClientEvent::user_message(content),
            ClientEvent::ResponseCreate,
        ],
    }
}

/// Translate one engine event into zero or more client frames, updating the
/// reply accumulator.
///
/// The accumulator is reset when a response completes. An in-band engine
/// error does not reset it: partial text already shown to the user stays
/// visible, and only the current response context is abandoned.
pub fn encode_client_frames(
    event: EngineEvent,
    accumulator: &mut String,
) -> Vec<ChatOutgoingMessage> {
    match event {
        EngineEvent::TextDelta { delta } => {
            accumulator.push_str(&delta);
            vec![ChatOutgoingMessage::TextDelta { delta }]
        }

        EngineEvent::TextDone { text } => {
            // The done event is authoritative even if deltas were lossy
            accumulator.clear();
            accumulator.push_str(&text);
            vec![ChatOutgoingMessage::AssistantMessage { text }]
        }

        EngineEvent::ResponseDone => {
            accumulator.clear();
            vec![ChatOutgoingMessage::ResponseDone]
        }

        EngineEvent::Error { error } => vec![ChatOutgoingMessage::Error {
            error: error.to_string(),
        }],

        // Answered server-side by the session's approval policy
        EngineEvent::ToolApprovalRequested { .. } => Vec::new(),

        EngineEvent::SessionCreated { session } => {
            tracing::debug!(engine_session = %session.id, "Engine session created");
            Vec::new()
        }

        EngineEvent::Unknown => {
            tracing::trace!("Dropping unrecognized engine event");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::EngineErrorDetail;

    #[test]
    fn test_decode_valid_message() {
        let msg = decode_client_frame(r#"{"type":"message","content":"hello"}"#).unwrap();
        match msg {
            ChatIncomingMessage::Message { content } => assert_eq!(content, "hello"),
            _ => panic!("Expected Message variant"),
        }
    }

    #[test]
    fn test_decode_non_json_fails() {
        let err = decode_client_frame("not json").unwrap_err();
        assert!(err.to_string().contains("Malformed payload"));
    }

    #[test]
    fn test_decode_missing_content_fails() {
        assert!(decode_client_frame(r#"{"type":"message"}"#).is_err());
    }

    #[test]
    fn test_ping_produces_no_engine_events() {
        let events = encode_engine_request(&ChatIncomingMessage::Ping);
        assert!(events.is_empty());
    }

    #[test]
    fn test_message_produces_item_then_response_pair() {
        let msg = ChatIncomingMessage::Message {
            content: "hello".to_string(),
        };
        let events = encode_engine_request(&msg);
        assert_eq!(events.len(), 2);
        match &events[0] {
            ClientEvent::ConversationItemCreate { item } => {
                assert_eq!(item.content[0].text, "hello");
            }
            _ => panic!("Expected ConversationItemCreate first"),
        }
        assert!(matches!(events[1], ClientEvent::ResponseCreate));
    }

    #[test]
    fn test_delta_appends_and_forwards() {
        let mut acc = String::new();
        let frames = encode_client_frames(
            EngineEvent::TextDelta {
                delta: "Hi".to_string(),
            },
            &mut acc,
        );
        assert_eq!(acc, "Hi");
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            ChatOutgoingMessage::TextDelta { delta } => assert_eq!(delta, "Hi"),
            _ => panic!("Expected TextDelta frame"),
        }

        let frames = encode_client_frames(
            EngineEvent::TextDelta {
                delta: " there".to_string(),
            },
            &mut acc,
        );
        assert_eq!(acc, "Hi there");
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_done_text_is_authoritative() {
        // Deltas were lossy: accumulator drifted from the real reply
        let mut acc = "Hi ther".to_string();
        let frames = encode_client_frames(
            EngineEvent::TextDone {
                text: "Hi there".to_string(),
            },
            &mut acc,
        );
        assert_eq!(acc, "Hi there");
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            ChatOutgoingMessage::AssistantMessage { text } => assert_eq!(text, "Hi there"),
            _ => panic!("Expected AssistantMessage frame"),
        }
    }

    #[test]
    fn test_response_done_resets_accumulator() {
        let mut acc = "Hi there".to_string();
        let frames = encode_client_frames(EngineEvent::ResponseDone, &mut acc);
        assert!(acc.is_empty());
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], ChatOutgoingMessage::ResponseDone));
    }

    #[test]
    fn test_error_leaves_accumulator_intact() {
        let mut acc = "partial reply".to_string();
        let frames = encode_client_frames(
            EngineEvent::Error {
                error: EngineErrorDetail {
                    message: "engine overloaded".to_string(),
                    code: None,
                },
            },
            &mut acc,
        );
        assert_eq!(acc, "partial reply");
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            ChatOutgoingMessage::Error { error } => {
                assert!(error.contains("engine overloaded"));
            }
            _ => panic!("Expected Error frame"),
        }
    }

    #[test]
    fn test_tool_approval_not_surfaced() {
        let mut acc = String::new();
        let frames = encode_client_frames(
            EngineEvent::ToolApprovalRequested {
                tool_name: "weather_lookup".to_string(),
                approval_id: "appr_1".to_string(),
            },
            &mut acc,
        );
        assert!(frames.is_empty());
    }

    #[test]
    fn test_unknown_event_dropped() {
        let mut acc = String::new();
        let frames = encode_client_frames(EngineEvent::Unknown, &mut acc);
        assert!(frames.is_empty());
        assert!(acc.is_empty());
    }

    #[test]
    fn test_full_turn_accumulation() {
        // Delta sequence whose concatenation equals the done text
        let mut acc = String::new();
        for chunk in ["The ", "weather ", "is ", "sunny"] {
            encode_client_frames(
                EngineEvent::TextDelta {
                    delta: chunk.to_string(),
                },
                &mut acc,
            );
        }
        assert_eq!(acc, "The weather is sunny");

        let frames = encode_client_frames(
            EngineEvent::TextDone {
                text: "The weather is sunny".to_string(),
            },
            &mut acc,
        );
        match &frames[0] {
            ChatOutgoingMessage::AssistantMessage { text } => {
                assert_eq!(text, "The weather is sunny");
            }
            _ => panic!("Expected AssistantMessage frame"),
        }

        encode_client_frames(EngineEvent::ResponseDone, &mut acc);
        assert!(acc.is_empty());
    }
}
