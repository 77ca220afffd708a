//! Session limit middleware for the chat WebSocket endpoint
//!
//! Rejects new WebSocket upgrades once the configured maximum number of
//! concurrent chat sessions is reached. The count comes straight from the
//! session registry, so a slot frees up exactly when a session deregisters
//! itself during teardown.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use crate::state::AppState;

/// Middleware that enforces the concurrent-session cap.
///
/// Only WebSocket upgrade requests (detected by the Upgrade header) are
/// limited; plain HTTP requests pass through. Returns 503 Service
/// Unavailable when the gateway is at capacity.
pub async fn session_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let is_ws_upgrade = request
        .headers()
        .get("upgrade")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);

    if !is_ws_upgrade {
        return next.run(request).await;
    }

    if let Some(max) = state.config.max_chat_sessions {
        let active = state.sessions.count();
        if active >= max {
            warn!(active, max, "Rejecting connection: session limit reached");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "Server at capacity. Please try again later.",
            )
                .into_response();
        }
    }

    next.run(request).await
}
