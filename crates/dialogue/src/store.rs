//! In-memory session registry.
//!
//! Sessions are keyed by a uuid token minted at creation, never by the
//! connection handle. The registry only does bookkeeping: create on
//! connect, look up by token, evict on disconnect. There is no
//! persistence; eviction is the end of the session's life.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::session::Session;

/// Shared handle to one session. Lock scope stays short: turn
/// processing snapshots under the lock, awaits outside it, and locks
/// again to merge.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Process-wide registry of live sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a token and register a fresh session under it.
    pub fn create(&self) -> (String, SessionHandle) {
        let token = uuid::Uuid::new_v4().to_string();
        let handle = Arc::new(Mutex::new(Session::new(token.clone())));
        self.sessions.write().insert(token.clone(), handle.clone());
        tracing::info!(session = %token, "session created");
        (token, handle)
    }

    /// Look up a session by its token.
    pub fn get(&self, token: &str) -> Option<SessionHandle> {
        self.sessions.read().get(token).cloned()
    }

    /// Evict a session. Returns the handle so a caller can log final
    /// state; the session is gone from the registry either way.
    pub fn remove(&self, token: &str) -> Option<SessionHandle> {
        let removed = self.sessions.write().remove(token);
        if removed.is_some() {
            tracing::info!(session = %token, "session evicted");
        }
        removed
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_get_remove_roundtrip() {
        let registry = SessionRegistry::new();
        let (token, _handle) = registry.create();
        assert_eq!(registry.len(), 1);

        let found = registry.get(&token).expect("session should exist");
        assert_eq!(found.lock().token, token);

        assert!(registry.remove(&token).is_some());
        assert!(registry.get(&token).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_unknown_token_is_a_noop() {
        let registry = SessionRegistry::new();
        assert!(registry.remove("nope").is_none());
    }

    #[test]
    fn sessions_are_independent() {
        let registry = SessionRegistry::new();
        let (a, handle_a) = registry.create();
        let (b, _handle_b) = registry.create();
        assert_ne!(a, b);

        handle_a
            .lock()
            .state
            .set("dataset_purpose", serde_json::json!("orders"));

        let b_state = registry.get(&b).unwrap();
        assert!(!b_state.lock().state.is_set("dataset_purpose"));
    }

    #[test]
    fn concurrent_create_and_remove() {
        let registry = Arc::new(SessionRegistry::new());
        let mut threads = Vec::new();
        for _ in 0..8 {
            let reg = registry.clone();
            threads.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    let (token, _) = reg.create();
                    assert!(reg.get(&token).is_some());
                    reg.remove(&token);
                }
            }));
        }
        for t in threads {
            t.join().unwrap();
        }
        assert!(registry.is_empty());
    }
}
