//! Browser chat transport.
//!
//! `messages` defines the JSON wire protocol; `handler` is the WebSocket
//! entry point that turns each accepted socket into a running session.

pub mod handler;
pub mod messages;

pub use handler::{chat_page, chat_stream_handler};
