//! REST API route configuration
//!
//! # Endpoints
//!
//! - `GET /chat-status` - Active session count for health dashboards

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::api::chat_status;
use crate::state::AppState;

/// Create the API router
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat-status", get(chat_status))
        .layer(TraceLayer::new_for_http())
}
