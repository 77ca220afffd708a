//! Chat WebSocket handler
//!
//! The transport factory for chat sessions: each accepted WebSocket becomes
//! one [`Session`] bridging the client to its own agent engine connection.

use axum::{
    extract::{
        State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::{Html, Response},
};
use std::sync::Arc;
use tracing::{error, info};

use crate::core::engine::RealtimeEngineClient;
use crate::core::session::{AutoApproveAll, Session};
use crate::handlers::chat::messages::ChatOutgoingMessage;
use crate::state::AppState;
use crate::transport::{ClientConnection, ws::WsClientConnection};

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Chat page served at `GET /chat`.
pub async fn chat_page() -> Html<&'static str> {
    Html(include_str!("../../../static/chat.html"))
}

/// Chat WebSocket handler
///
/// Upgrades the HTTP connection to WebSocket for the browser chat protocol.
///
/// # Arguments
/// * `ws` - The WebSocket upgrade request from Axum
/// * `state` - Application state containing configuration and the registry
///
/// # Returns
/// * `Response` - HTTP response that upgrades the connection to WebSocket
pub async fn chat_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Chat WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_chat_socket(socket, state))
}

/// Handle one accepted chat socket for its whole lifetime.
async fn handle_chat_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let mut conn = WsClientConnection::new(socket);
    let connection_id = conn.id();
    info!(connection = %connection_id, "Chat WebSocket connection established");

    // Session-scoped engine configuration; without a credential there is
    // nothing to bridge to
    let Some(engine_config) = app_state.engine_config() else {
        error!(connection = %connection_id, "Engine API key not configured");
        let _ = conn
            .send(ChatOutgoingMessage::Error {
                error: "Agent engine credential not configured".to_string(),
            })
            .await;
        let _ = conn.close().await;
        return;
    };

    let engine = match RealtimeEngineClient::new(engine_config) {
        Ok(engine) => engine,
        Err(e) => {
            error!(connection = %connection_id, error = %e, "Failed to create engine client");
            let _ = conn
                .send(ChatOutgoingMessage::Error {
                    error: format!("Upstream connection failed: {e}"),
                })
                .await;
            let _ = conn.close().await;
            return;
        }
    };

    let session = Session::new(
        Box::new(conn),
        Box::new(engine),
        app_state.sessions.clone(),
        Arc::new(AutoApproveAll),
        app_state.session_limits(),
    );

    app_state.sessions.register(session.handle());
    session.run().await;

    info!(connection = %connection_id, "Chat session terminated");
}
