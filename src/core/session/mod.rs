//! Chat session lifecycle.
//!
//! A [`Session`] pairs exactly one client connection with exactly one agent
//! engine handle and runs the codec in both directions from a single
//! dispatch loop. Everything a session touches is its own: the only shared
//! structure is the [`SessionRegistry`], and the only cross-task signal is
//! the cancellation token handed out through [`SessionHandle`].
//!
//! Lifecycle: `Initializing -> Active -> Closing -> Closed`, strictly in
//! that direction. The engine handshake is the only long suspension point;
//! it runs concurrently with inbound traffic, which is queued (bounded)
//! until the engine is ready.

pub mod approval;
pub mod registry;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::codec;
use crate::core::engine::{AgentEngine, ClientEvent, EngineEvent};
use crate::handlers::chat::messages::{ChatIncomingMessage, ChatOutgoingMessage};
use crate::transport::ClientConnection;

pub use approval::{ApprovalDecision, ApprovalPolicy, AutoApproveAll};
pub use registry::{SessionHandle, SessionRegistry};

/// How often an Active session checks whether it has gone idle when no
/// explicit idle timeout shortens the probe.
const IDLE_PROBE_INTERVAL: Duration = Duration::from_secs(30);

// =============================================================================
// Lifecycle State
// =============================================================================

/// Lifecycle state of a session. Transitions are one-directional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Client accepted; engine handshake in flight
    Initializing,
    /// Both handles live, normal bidirectional flow
    Active,
    /// Teardown in progress; inbound messages ignored
    Closing,
    /// Terminal; deregistered and inert
    Closed,
}

impl SessionState {
    /// Whether this is the terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Initializing => write!(f, "Initializing"),
            SessionState::Active => write!(f, "Active"),
            SessionState::Closing => write!(f, "Closing"),
            SessionState::Closed => write!(f, "Closed"),
        }
    }
}

// =============================================================================
// Limits
// =============================================================================

/// Per-session resource limits.
#[derive(Debug, Clone)]
pub struct SessionLimits {
    /// Maximum inbound messages queued while the engine handshake runs;
    /// overflow drops the oldest entry
    pub pending_queue_capacity: usize,
    /// Bound on the engine handshake
    pub handshake_timeout: Duration,
    /// Idle window after which an Active session is closed; `None` disables
    pub idle_timeout: Option<Duration>,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            pending_queue_capacity: 16,
            handshake_timeout: Duration::from_secs(10),
            idle_timeout: Some(Duration::from_secs(300)),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// One client connection paired with one engine connection.
pub struct Session {
    id: Uuid,
    conn: Box<dyn ClientConnection>,
    engine: Box<dyn AgentEngine>,
    state: SessionState,
    /// In-progress assistant reply, reset when a response completes
    accumulator: String,
    registry: SessionRegistry,
    approval: Arc<dyn ApprovalPolicy>,
    limits: SessionLimits,
    cancel: CancellationToken,
}

/// Outcome of the Initializing phase.
enum InitOutcome {
    /// Engine connected; messages that arrived meanwhile, in arrival order
    Connected(VecDeque<String>),
    /// Session ended before reaching Active
    Ended,
}

impl Session {
    /// Create a session around an accepted connection and an unconnected
    /// engine handle. The session id is the connection id.
    pub fn new(
        conn: Box<dyn ClientConnection>,
        engine: Box<dyn AgentEngine>,
        registry: SessionRegistry,
        approval: Arc<dyn ApprovalPolicy>,
        limits: SessionLimits,
    ) -> Self {
        Self {
            id: conn.id(),
            conn,
            engine,
            state: SessionState::Initializing,
            accumulator: String::new(),
            registry,
            approval,
            limits,
            cancel: CancellationToken::new(),
        }
    }

    /// Session id (the connection id).
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Registry handle for this session. The factory registers it before
    /// handing control to [`run`](Self::run).
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(self.id, self.cancel.clone())
    }

    /// Drive the session to completion.
    ///
    /// Consumes the session; when this returns, both handles are closed and
    /// the session has removed itself from the registry. Removal is backed
    /// by a drop guard so even a panicking dispatch path cannot leave a
    /// stale registry entry behind.
    pub async fn run(mut self) {
        let mut guard = DeregisterGuard::new(self.registry.clone(), self.id);

        // The client learns the socket is live before the engine is ready
        if let Err(e) = self.conn.send(ChatOutgoingMessage::Connected).await {
            warn!(session = %self.id, error = %e, "Client gone before greeting");
            self.finalize(&mut guard).await;
            return;
        }

        let pending = match self.initialize().await {
            InitOutcome::Connected(pending) => pending,
            InitOutcome::Ended => {
                self.finalize(&mut guard).await;
                return;
            }
        };

        let Some(mut events) = self.engine.take_events() else {
            error!(session = %self.id, "Engine connected but produced no event stream");
            let _ = self
                .conn
                .send(ChatOutgoingMessage::Error {
                    error: "Upstream connection failed".to_string(),
                })
                .await;
            self.finalize(&mut guard).await;
            return;
        };

        self.transition(SessionState::Active);

        // Replay messages queued during the handshake, in arrival order
        let mut live = true;
        for payload in pending {
            if !self.handle_client_payload(&payload).await {
                live = false;
                break;
            }
        }

        if live {
            self.active_loop(&mut events).await;
        }

        self.finalize(&mut guard).await;
    }

    /// Initializing phase: race the bounded engine handshake against
    /// inbound client traffic and close requests.
    async fn initialize(&mut self) -> InitOutcome {
        let mut pending: VecDeque<String> = VecDeque::new();
        let handshake = tokio::time::timeout(self.limits.handshake_timeout, self.engine.connect());
        tokio::pin!(handshake);

        loop {
            tokio::select! {
                result = &mut handshake => {
                    return match result {
                        Ok(Ok(())) => InitOutcome::Connected(pending),
                        Ok(Err(e)) => {
                            warn!(session = %self.id, error = %e, "Engine handshake failed");
                            let _ = self.conn.send(ChatOutgoingMessage::Error {
                                error: format!("Upstream connection failed: {e}"),
                            }).await;
                            InitOutcome::Ended
                        }
                        Err(_) => {
                            warn!(
                                session = %self.id,
                                timeout = ?self.limits.handshake_timeout,
                                "Engine handshake timed out"
                            );
                            let _ = self.conn.send(ChatOutgoingMessage::Error {
                                error: "Upstream connection timed out".to_string(),
                            }).await;
                            InitOutcome::Ended
                        }
                    };
                }

                inbound = self.conn.recv() => {
                    match inbound {
                        Some(Ok(payload)) => {
                            if enqueue_pending(
                                &mut pending,
                                self.limits.pending_queue_capacity,
                                payload,
                            ) {
                                warn!(
                                    session = %self.id,
                                    capacity = self.limits.pending_queue_capacity,
                                    "Pending queue full, dropped oldest queued message"
                                );
                            }
                        }
                        Some(Err(e)) => {
                            warn!(session = %self.id, error = %e, "Client socket error during handshake");
                            return InitOutcome::Ended;
                        }
                        None => {
                            info!(session = %self.id, "Client closed during handshake");
                            return InitOutcome::Ended;
                        }
                    }
                }

                _ = self.cancel.cancelled() => {
                    info!(session = %self.id, "Close requested during handshake");
                    let _ = self.conn.send(ChatOutgoingMessage::Error {
                        error: "Session closed by server".to_string(),
                    }).await;
                    return InitOutcome::Ended;
                }
            }
        }
    }

    /// Active phase: one loop serializes all client-originated and
    /// engine-originated processing, so causally dependent event pairs are
    /// never interleaved with a later message's events.
    async fn active_loop(&mut self, events: &mut tokio::sync::mpsc::Receiver<EngineEvent>) {
        let idle_probe = self
            .limits
            .idle_timeout
            .map(|t| (t / 2).max(Duration::from_millis(10)))
            .unwrap_or(IDLE_PROBE_INTERVAL);
        let mut last_activity = Instant::now();

        loop {
            tokio::select! {
                inbound = self.conn.recv() => {
                    last_activity = Instant::now();
                    match inbound {
                        Some(Ok(payload)) => {
                            if !self.handle_client_payload(&payload).await {
                                return;
                            }
                        }
                        Some(Err(e)) => {
                            warn!(session = %self.id, error = %e, "Client socket error");
                            return;
                        }
                        None => {
                            info!(session = %self.id, "Client closed the connection");
                            return;
                        }
                    }
                }

                event = events.recv() => {
                    last_activity = Instant::now();
                    match event {
                        Some(event) => {
                            if !self.handle_engine_event(event).await {
                                return;
                            }
                        }
                        None => {
                            warn!(session = %self.id, "Engine connection lost");
                            let _ = self.conn.send(ChatOutgoingMessage::Error {
                                error: "Upstream connection lost".to_string(),
                            }).await;
                            return;
                        }
                    }
                }

                _ = self.cancel.cancelled() => {
                    info!(session = %self.id, "Close requested");
                    let _ = self.conn.send(ChatOutgoingMessage::Error {
                        error: "Session closed by server".to_string(),
                    }).await;
                    return;
                }

                _ = tokio::time::sleep(idle_probe) => {
                    if let Some(limit) = self.limits.idle_timeout
                        && last_activity.elapsed() > limit
                    {
                        warn!(
                            session = %self.id,
                            idle_secs = last_activity.elapsed().as_secs(),
                            "Closing idle session"
                        );
                        let _ = self.conn.send(ChatOutgoingMessage::Error {
                            error: "Connection closed due to inactivity".to_string(),
                        }).await;
                        return;
                    }
                }
            }
        }
    }

    /// Process one raw client payload. Returns false when the session must
    /// move to Closing.
    ///
    /// Malformed or invalid messages are recoverable: the client gets an
    /// `error` frame and the session stays Active.
    async fn handle_client_payload(&mut self, payload: &str) -> bool {
        let msg = match codec::decode_client_frame(payload) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(session = %self.id, error = %e, "Rejecting malformed client frame");
                return self
                    .send_or_end(ChatOutgoingMessage::Error {
                        error: e.to_string(),
                    })
                    .await;
            }
        };

        if let Err(e) = msg.validate() {
            debug!(session = %self.id, error = %e, "Rejecting invalid client message");
            return self
                .send_or_end(ChatOutgoingMessage::Error {
                    error: e.to_string(),
                })
                .await;
        }

        if matches!(msg, ChatIncomingMessage::Ping) {
            return self.send_or_end(ChatOutgoingMessage::Pong).await;
        }

        // Both events of the pair are sent before the next inbound frame is
        // examined; per-session ordering holds by construction
        for event in codec::encode_engine_request(&msg) {
            if let Err(e) = self.engine.send_event(event).await {
                error!(session = %self.id, error = %e, "Failed to forward message to engine");
                let _ = self
                    .conn
                    .send(ChatOutgoingMessage::Error {
                        error: "Upstream connection lost".to_string(),
                    })
                    .await;
                return false;
            }
        }
        true
    }

    /// Process one engine event. Returns false when the session must move
    /// to Closing.
    async fn handle_engine_event(&mut self, event: EngineEvent) -> bool {
        if let EngineEvent::ToolApprovalRequested {
            tool_name,
            approval_id,
        } = &event
        {
            // Answered server-side; the client never sees approval traffic
            let decision = self.approval.decide(tool_name, approval_id).await;
            let respond = ClientEvent::ToolApprovalRespond {
                approval_id: approval_id.clone(),
                approve: decision.is_approved(),
            };
            if let Err(e) = self.engine.send_event(respond).await {
                error!(session = %self.id, error = %e, "Failed to answer tool approval");
                let _ = self
                    .conn
                    .send(ChatOutgoingMessage::Error {
                        error: "Upstream connection lost".to_string(),
                    })
                    .await;
                return false;
            }
            return true;
        }

        for frame in codec::encode_client_frames(event, &mut self.accumulator) {
            if !self.send_or_end(frame).await {
                return false;
            }
        }
        true
    }

    /// Send one frame; a delivery failure ends the session.
    async fn send_or_end(&mut self, frame: ChatOutgoingMessage) -> bool {
        if let Err(e) = self.conn.send(frame).await {
            warn!(session = %self.id, error = %e, "Failed to deliver frame to client");
            return false;
        }
        true
    }

    /// Closing phase: release both handles (each close is idempotent),
    /// deregister exactly once, reach Closed.
    async fn finalize(&mut self, guard: &mut DeregisterGuard) {
        self.transition(SessionState::Closing);
        if let Err(e) = self.engine.close().await {
            debug!(session = %self.id, error = %e, "Engine close reported an error");
        }
        if let Err(e) = self.conn.close().await {
            debug!(session = %self.id, error = %e, "Connection close reported an error");
        }
        guard.release();
        self.transition(SessionState::Closed);
    }

    fn transition(&mut self, next: SessionState) {
        debug!(session = %self.id, from = %self.state, to = %next, "Session state transition");
        self.state = next;
    }
}

/// Push a payload onto the bounded pending queue, evicting the oldest
/// entries when full. Returns true when anything was dropped.
fn enqueue_pending(queue: &mut VecDeque<String>, capacity: usize, payload: String) -> bool {
    let mut dropped = false;
    while queue.len() >= capacity.max(1) {
        queue.pop_front();
        dropped = true;
    }
    queue.push_back(payload);
    dropped
}

/// Removes the session from the registry exactly once, on every exit path.
struct DeregisterGuard {
    registry: SessionRegistry,
    id: Uuid,
    armed: bool,
}

impl DeregisterGuard {
    fn new(registry: SessionRegistry, id: Uuid) -> Self {
        Self {
            registry,
            id,
            armed: true,
        }
    }

    fn release(&mut self) {
        if self.armed {
            self.armed = false;
            self.registry.deregister(self.id);
        }
    }
}

impl Drop for DeregisterGuard {
    fn drop(&mut self) {
        if self.armed {
            self.registry.deregister(self.id);
        }
    }
}
