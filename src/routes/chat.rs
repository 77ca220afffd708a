//! Chat route configuration
//!
//! # Endpoints
//!
//! - `GET /chat` - Static chat UI
//! - `GET /chat-stream` - WebSocket upgrade for the chat protocol
//!
//! # Protocol
//!
//! After the WebSocket upgrade the server immediately sends
//! `{"type":"connected"}`, then clients exchange JSON frames:
//!
//! ```json
//! // Client sends
//! {"type": "message", "content": "hello"}
//! {"type": "ping"}
//!
//! // Server responds
//! {"type": "text.delta", "delta": "Hi"}
//! {"type": "assistant.message", "text": "Hi there"}
//! {"type": "response.done"}
//! {"type": "pong"}
//! {"type": "error", "error": "..."}
//! ```

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::chat::{chat_page, chat_stream_handler};
use crate::state::AppState;

/// Create the chat router
pub fn create_chat_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", get(chat_page))
        .route("/chat-stream", get(chat_stream_handler))
        .layer(TraceLayer::new_for_http())
}
