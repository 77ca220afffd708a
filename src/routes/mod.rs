//! Route configuration for the gateway's HTTP and WebSocket surface.

pub mod api;
pub mod chat;
