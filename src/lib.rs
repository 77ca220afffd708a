pub mod config;
pub mod core;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod transport;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use self::core::*;
pub use state::AppState;
