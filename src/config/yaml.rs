use serde::Deserialize;
use std::path::PathBuf;

use super::{ConfigError, ServerConfig, TlsConfig};

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration; anything unset
/// here keeps the value loaded from the environment (or the default).
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   tls:
///     enabled: true
///     cert_path: "/etc/switchboard/cert.pem"
///     key_path: "/etc/switchboard/key.pem"
///
/// engine:
///   url: "wss://api.openai.com/v1/realtime"
///   model: "gpt-4o-realtime-preview"
///   api_key: "sk-your-key"
///   instructions: "You are a call-center assistant."
///   handshake_timeout_seconds: 10
///
/// chat:
///   pending_queue_capacity: 16
///   idle_timeout_seconds: 300
///   max_sessions: 500
///
/// security:
///   cors_allowed_origins: "https://app.example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub engine: Option<EngineYaml>,
    pub chat: Option<ChatYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Agent engine configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EngineYaml {
    pub url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub instructions: Option<String>,
    pub handshake_timeout_seconds: Option<u64>,
}

/// Chat session configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ChatYaml {
    pub pending_queue_capacity: Option<usize>,
    pub idle_timeout_seconds: Option<u64>,
    pub max_sessions: Option<usize>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
}

impl YamlConfig {
    /// Overlay this file's values onto an already-loaded configuration.
    pub fn apply(self, config: &mut ServerConfig) -> Result<(), ConfigError> {
        if let Some(server) = self.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(tls) = server.tls
                && tls.enabled.unwrap_or(false)
            {
                match (tls.cert_path, tls.key_path) {
                    (Some(cert), Some(key)) => {
                        config.tls = Some(TlsConfig {
                            cert_path: PathBuf::from(cert),
                            key_path: PathBuf::from(key),
                        });
                    }
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: "server.tls".to_string(),
                            detail: "cert_path and key_path are required when enabled".to_string(),
                        });
                    }
                }
            }
        }

        if let Some(engine) = self.engine {
            if let Some(url) = engine.url {
                config.engine_url = url;
            }
            if let Some(model) = engine.model {
                config.engine_model = model;
            }
            if let Some(api_key) = engine.api_key {
                config.engine_api_key = Some(api_key);
            }
            if let Some(instructions) = engine.instructions {
                config.engine_instructions = Some(instructions);
            }
            if let Some(timeout) = engine.handshake_timeout_seconds {
                config.engine_handshake_timeout_seconds = timeout;
            }
        }

        if let Some(chat) = self.chat {
            if let Some(capacity) = chat.pending_queue_capacity {
                config.chat_pending_queue_capacity = capacity;
            }
            if let Some(idle) = chat.idle_timeout_seconds {
                config.chat_idle_timeout_seconds = idle;
            }
            if let Some(max) = chat.max_sessions {
                config.max_chat_sessions = Some(max);
            }
        }

        if let Some(security) = self.security {
            if let Some(origins) = security.cors_allowed_origins {
                config.cors_allowed_origins = Some(origins);
            }
            if let Some(rps) = security.rate_limit_requests_per_second {
                config.rate_limit_requests_per_second = rps;
            }
            if let Some(burst) = security.rate_limit_burst_size {
                config.rate_limit_burst_size = burst;
            }
        }

        Ok(())
    }
}
