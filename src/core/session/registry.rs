//! Session registry.
//!
//! One concurrent map from connection id to live session, shared by the
//! transport factory (insert), the sessions themselves (remove, as part of
//! their own teardown) and the status endpoint (count). This is the only
//! mutable state sessions share.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Registry entry for one live session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// Connection id the session is keyed by
    pub id: Uuid,
    /// When the connection was accepted
    pub opened_at: Instant,
    cancel: CancellationToken,
}

impl SessionHandle {
    /// Create a handle for a session keyed by `id`.
    pub fn new(id: Uuid, cancel: CancellationToken) -> Self {
        Self {
            id,
            opened_at: Instant::now(),
            cancel,
        }
    }

    /// Ask the session to begin Closing. Idempotent.
    pub fn request_close(&self) {
        self.cancel.cancel();
    }

    /// Whether closing has been requested.
    pub fn close_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Concurrent map of all live chat sessions.
///
/// A session appears here exactly while its state is non-terminal: the
/// factory registers it at creation and the session deregisters itself
/// during teardown. Nothing else ever reaches in.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<DashMap<Uuid, SessionHandle>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session under its connection id.
    ///
    /// Each connection id maps to at most one session for its whole
    /// lifetime, so the key must be absent; a collision means a lifecycle
    /// bug and is logged rather than silently tolerated.
    pub fn register(&self, handle: SessionHandle) {
        let id = handle.id;
        if self.inner.insert(id, handle).is_some() {
            warn!(session = %id, "Registered a session over an existing entry");
        } else {
            debug!(session = %id, active = self.inner.len(), "Session registered");
        }
    }

    /// Remove a session. No-op if absent, since redundant teardown
    /// triggers may deregister more than once.
    pub fn deregister(&self, id: Uuid) -> bool {
        let removed = self.inner.remove(&id).is_some();
        if removed {
            debug!(session = %id, active = self.inner.len(), "Session deregistered");
        }
        removed
    }

    /// Whether a session is currently tracked.
    pub fn contains(&self, id: Uuid) -> bool {
        self.inner.contains_key(&id)
    }

    /// Number of currently-tracked sessions.
    pub fn count(&self) -> usize {
        self.inner.len()
    }

    /// Request Closing on every tracked session.
    ///
    /// Used at process shutdown. Works on a snapshot of the current
    /// entries so sessions deregistering concurrently from their own
    /// close paths cannot deadlock the iteration.
    pub fn close_all(&self) {
        let snapshot: Vec<SessionHandle> = self.inner.iter().map(|e| e.value().clone()).collect();
        if snapshot.is_empty() {
            return;
        }
        info!(sessions = snapshot.len(), "Requesting close on all active sessions");
        for handle in snapshot {
            handle.request_close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> SessionHandle {
        SessionHandle::new(Uuid::new_v4(), CancellationToken::new())
    }

    #[test]
    fn test_register_and_count() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.count(), 0);

        let a = handle();
        let b = handle();
        registry.register(a.clone());
        registry.register(b.clone());
        assert_eq!(registry.count(), 2);
        assert!(registry.contains(a.id));
        assert!(registry.contains(b.id));
    }

    #[test]
    fn test_deregister_is_idempotent() {
        let registry = SessionRegistry::new();
        let h = handle();
        registry.register(h.clone());

        assert!(registry.deregister(h.id));
        assert_eq!(registry.count(), 0);

        // Second removal is a no-op, not an error
        assert!(!registry.deregister(h.id));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_close_all_signals_every_session() {
        let registry = SessionRegistry::new();
        let a = handle();
        let b = handle();
        registry.register(a.clone());
        registry.register(b.clone());

        assert!(!a.close_requested());
        assert!(!b.close_requested());

        registry.close_all();
        assert!(a.close_requested());
        assert!(b.close_requested());

        // close_all only signals; sessions deregister themselves
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_close_all_on_empty_registry() {
        let registry = SessionRegistry::new();
        registry.close_all();
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_request_close_is_idempotent() {
        let h = handle();
        h.request_close();
        h.request_close();
        assert!(h.close_requested());
    }
}
