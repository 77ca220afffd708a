//! HTTP and WebSocket request handlers
//!
//! This module organizes all handlers into logical groups:
//! - `api` - Health check and chat status endpoints
//! - `chat` - Browser chat WebSocket transport

pub mod api;
pub mod chat;

// Re-export commonly used handlers for convenient access
pub use chat::chat_stream_handler;
