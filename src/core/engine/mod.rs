//! Agent engine connection layer.
//!
//! One [`AgentEngine`] handle wraps one upstream connection to the external
//! realtime agent engine. The handle is exclusively owned by a single chat
//! session for its whole lifetime.

pub mod base;
pub mod client;
pub mod events;

pub use base::{AgentEngine, ConnectionState, EngineConfig, EngineError, EngineResult};
pub use client::RealtimeEngineClient;
pub use events::{
    ClientEvent, ContentPart, ConversationItem, EngineErrorDetail, EngineEvent, EngineSessionInfo,
    ItemRole, SessionBootstrap,
};
