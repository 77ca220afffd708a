//! Health and status endpoints.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::state::AppState;

/// Health check endpoint
///
/// Returns service status and version. Served without authentication so
/// load balancers and orchestrators can probe it.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Chat transport status endpoint
///
/// Reports the number of currently active chat sessions from the registry.
pub async fn chat_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "active_sessions": state.sessions.count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[tokio::test]
    async fn test_health_check_shape() {
        let Json(body) = health_check().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_chat_status_counts_sessions() {
        let state = AppState::new(ServerConfig::default()).await;
        let Json(body) = chat_status(State(state.clone())).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_sessions"], 0);
    }
}
