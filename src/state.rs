//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::engine::EngineConfig;
use crate::core::session::{SessionLimits, SessionRegistry};

/// State shared by all handlers and middleware.
pub struct AppState {
    /// Loaded server configuration
    pub config: Arc<ServerConfig>,
    /// Registry of live chat sessions
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Create the application state from a loaded configuration.
    pub async fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            sessions: SessionRegistry::new(),
        })
    }

    /// Session-scoped engine configuration, or `None` when no engine
    /// credential is configured.
    pub fn engine_config(&self) -> Option<EngineConfig> {
        let api_key = self.config.engine_api_key.clone()?;
        Some(EngineConfig {
            url: self.config.engine_url.clone(),
            api_key,
            model: self.config.engine_model.clone(),
            instructions: self.config.engine_instructions.clone(),
        })
    }

    /// Per-session limits derived from the configuration.
    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            pending_queue_capacity: self.config.chat_pending_queue_capacity,
            handshake_timeout: self.config.engine_handshake_timeout(),
            idle_timeout: self.config.chat_idle_timeout(),
        }
    }
}
