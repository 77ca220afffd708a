//! Configuration module for the Switchboard Gateway.
//!
//! This module handles server configuration from various sources: .env
//! files, YAML files, and environment variables. Priority: YAML > ENV vars
//! > defaults.
//!
//! # Example
//! ```rust,no_run
//! use switchboard_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable fallback
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use url::Url;

mod yaml;

use yaml::YamlConfig;

/// Default engine WebSocket endpoint.
pub const DEFAULT_ENGINE_URL: &str = "wss://api.openai.com/v1/realtime";

/// Default engine model.
pub const DEFAULT_ENGINE_MODEL: &str = "gpt-4o-realtime-preview";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {detail}")]
    InvalidValue { key: String, detail: String },

    #[error("Invalid engine URL: {0}")]
    InvalidEngineUrl(String),
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains everything needed to run the gateway:
/// - Server settings (host, port, TLS)
/// - Agent engine settings (endpoint, model, credential, instructions)
/// - Chat session settings (pending queue, timeouts, session cap)
/// - Security settings (CORS, rate limiting)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Agent engine settings
    /// WebSocket endpoint of the agent engine
    pub engine_url: String,
    /// Model identifier the engine serves sessions with
    pub engine_model: String,
    /// Engine API key; sessions cannot be opened without it
    pub engine_api_key: Option<String>,
    /// System instructions sent in every session bootstrap
    pub engine_instructions: Option<String>,
    /// Bound on the engine handshake, in seconds
    pub engine_handshake_timeout_seconds: u64,

    // Chat session settings
    /// Inbound messages queued while the engine handshake runs
    pub chat_pending_queue_capacity: usize,
    /// Idle window before an Active session is closed; 0 disables
    pub chat_idle_timeout_seconds: u64,
    /// Maximum concurrent chat sessions
    /// Default: None (unlimited)
    pub max_chat_sessions: Option<usize>,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,
}

/// Zeroize the engine credential when the config is dropped so the secret
/// does not linger in freed memory.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.engine_api_key {
            key.zeroize();
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            tls: None,
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            engine_model: DEFAULT_ENGINE_MODEL.to_string(),
            engine_api_key: None,
            engine_instructions: None,
            engine_handshake_timeout_seconds: 10,
            chat_pending_queue_capacity: 16,
            chat_idle_timeout_seconds: 300,
            max_chat_sessions: None,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (plus any `.env`
    /// already loaded by the caller).
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::load_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read environment variables without cross-field validation, so a
    /// YAML overlay can still correct values before validation runs.
    fn load_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(host) = env_string("HOST") {
            config.host = host;
        }
        if let Some(port) = env_parse::<u16>("PORT")? {
            config.port = port;
        }

        let cert_path = env_string("TLS_CERT_PATH");
        let key_path = env_string("TLS_KEY_PATH");
        config.tls = match (cert_path, key_path) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "TLS_CERT_PATH/TLS_KEY_PATH".to_string(),
                    detail: "both must be set to enable TLS".to_string(),
                });
            }
        };

        if let Some(url) = env_string("ENGINE_URL") {
            config.engine_url = url;
        }
        if let Some(model) = env_string("ENGINE_MODEL") {
            config.engine_model = model;
        }
        config.engine_api_key = env_string("ENGINE_API_KEY");
        config.engine_instructions = env_string("ENGINE_INSTRUCTIONS");
        if let Some(timeout) = env_parse::<u64>("ENGINE_HANDSHAKE_TIMEOUT_SECONDS")? {
            config.engine_handshake_timeout_seconds = timeout;
        }

        if let Some(capacity) = env_parse::<usize>("CHAT_PENDING_QUEUE_CAPACITY")? {
            config.chat_pending_queue_capacity = capacity;
        }
        if let Some(idle) = env_parse::<u64>("CHAT_IDLE_TIMEOUT_SECONDS")? {
            config.chat_idle_timeout_seconds = idle;
        }
        config.max_chat_sessions = env_parse::<usize>("MAX_CHAT_SESSIONS")?;

        config.cors_allowed_origins = env_string("CORS_ALLOWED_ORIGINS");
        if let Some(rps) = env_parse::<u32>("RATE_LIMIT_REQUESTS_PER_SECOND")? {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = env_parse::<u32>("RATE_LIMIT_BURST_SIZE")? {
            config.rate_limit_burst_size = burst;
        }

        Ok(config)
    }

    /// Load configuration from a YAML file, with environment variables
    /// filling anything the file leaves unset.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let yaml: YamlConfig = serde_yaml::from_str(&contents)?;

        let mut config = Self::load_env()?;
        yaml.apply(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Bind address as `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether TLS is configured.
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Engine handshake bound as a [`Duration`].
    pub fn engine_handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_handshake_timeout_seconds)
    }

    /// Idle window as a [`Duration`]; `None` when disabled.
    pub fn chat_idle_timeout(&self) -> Option<Duration> {
        match self.chat_idle_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Validate cross-field constraints.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.engine_url)
            .map_err(|e| ConfigError::InvalidEngineUrl(e.to_string()))?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(ConfigError::InvalidEngineUrl(format!(
                    "scheme must be ws or wss, got: {other}"
                )));
            }
        }
        if url.host_str().is_none() {
            return Err(ConfigError::InvalidEngineUrl("missing host".to_string()));
        }

        if self.engine_handshake_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ENGINE_HANDSHAKE_TIMEOUT_SECONDS".to_string(),
                detail: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                detail: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const GATEWAY_ENV_VARS: &[&str] = &[
        "HOST",
        "PORT",
        "TLS_CERT_PATH",
        "TLS_KEY_PATH",
        "ENGINE_URL",
        "ENGINE_MODEL",
        "ENGINE_API_KEY",
        "ENGINE_INSTRUCTIONS",
        "ENGINE_HANDSHAKE_TIMEOUT_SECONDS",
        "CHAT_PENDING_QUEUE_CAPACITY",
        "CHAT_IDLE_TIMEOUT_SECONDS",
        "MAX_CHAT_SESSIONS",
        "CORS_ALLOWED_ORIGINS",
        "RATE_LIMIT_REQUESTS_PER_SECOND",
        "RATE_LIMIT_BURST_SIZE",
    ];

    fn clear_env() {
        for key in GATEWAY_ENV_VARS {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert_eq!(config.engine_url, DEFAULT_ENGINE_URL);
        assert_eq!(config.engine_model, DEFAULT_ENGINE_MODEL);
        assert!(config.engine_api_key.is_none());
        assert_eq!(config.engine_handshake_timeout_seconds, 10);
        assert_eq!(config.chat_pending_queue_capacity, 16);
        assert_eq!(config.chat_idle_timeout_seconds, 300);
        assert!(config.max_chat_sessions.is_none());
        assert!(!config.is_tls_enabled());
        assert_eq!(config.address(), "0.0.0.0:3001");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        unsafe {
            std::env::set_var("HOST", "127.0.0.1");
            std::env::set_var("PORT", "8080");
            std::env::set_var("ENGINE_API_KEY", "sk-test");
            std::env::set_var("ENGINE_MODEL", "gpt-4o-mini-realtime-preview");
            std::env::set_var("CHAT_PENDING_QUEUE_CAPACITY", "4");
            std::env::set_var("MAX_CHAT_SESSIONS", "100");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.engine_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.engine_model, "gpt-4o-mini-realtime-preview");
        assert_eq!(config.chat_pending_queue_capacity, 4);
        assert_eq!(config.max_chat_sessions, Some(100));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port_rejected() {
        clear_env();
        unsafe { std::env::set_var("PORT", "not-a-port") };
        let result = ServerConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_engine_url_rejected() {
        clear_env();
        unsafe { std::env::set_var("ENGINE_URL", "https://engine.example.com") };
        let result = ServerConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidEngineUrl(_))));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_partial_tls_rejected() {
        clear_env();
        unsafe { std::env::set_var("TLS_CERT_PATH", "/tmp/cert.pem") };
        let result = ServerConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_zero_handshake_timeout_rejected() {
        clear_env();
        unsafe { std::env::set_var("ENGINE_HANDSHAKE_TIMEOUT_SECONDS", "0") };
        let result = ServerConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_idle_timeout_zero_disables() {
        clear_env();
        unsafe { std::env::set_var("CHAT_IDLE_TIMEOUT_SECONDS", "0") };
        let config = ServerConfig::from_env().unwrap();
        assert!(config.chat_idle_timeout().is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_yaml_overrides_env() {
        clear_env();
        unsafe {
            std::env::set_var("PORT", "8080");
            std::env::set_var("ENGINE_API_KEY", "sk-from-env");
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9090

engine:
  model: "gpt-4o-mini-realtime-preview"
  instructions: "You are a call-center assistant."

chat:
  pending_queue_capacity: 8
  max_sessions: 50

security:
  cors_allowed_origins: "*"
"#
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        // YAML wins over env
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "127.0.0.1");
        // env fills what YAML leaves unset
        assert_eq!(config.engine_api_key.as_deref(), Some("sk-from-env"));
        assert_eq!(config.engine_model, "gpt-4o-mini-realtime-preview");
        assert_eq!(
            config.engine_instructions.as_deref(),
            Some("You are a call-center assistant.")
        );
        assert_eq!(config.chat_pending_queue_capacity, 8);
        assert_eq!(config.max_chat_sessions, Some(50));
        assert_eq!(config.cors_allowed_origins.as_deref(), Some("*"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_config_file() {
        clear_env();
        let result = ServerConfig::from_file(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    #[serial]
    fn test_malformed_yaml_rejected() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server: [not: a: mapping").unwrap();
        let result = ServerConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }
}
