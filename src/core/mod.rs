//! Core protocol-translation and session machinery.
//!
//! - [`codec`] - stateless translation between the chat wire protocol and
//!   the engine event protocol
//! - [`engine`] - the upstream agent engine connection layer
//! - [`session`] - per-connection lifecycle, dispatch and registry

pub mod codec;
pub mod engine;
pub mod session;

pub use codec::DecodeError;
pub use engine::{
    AgentEngine, ClientEvent, ConnectionState, EngineConfig, EngineError, EngineEvent,
    EngineResult, RealtimeEngineClient,
};
pub use session::{
    ApprovalPolicy, AutoApproveAll, Session, SessionHandle, SessionLimits, SessionRegistry,
    SessionState,
};
