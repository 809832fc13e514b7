//! Process-wide, in-memory conversation history keyed by session id.
//!
//! Each session keeps at most [`DEFAULT_MAX_TURNS`] turns; older turns are discarded first.
//! Nothing is persisted: dropping the store (or exiting the process) forgets every session.
//!
//! # Example
//!
//! ```rust
//! use llmbridge::session_store::SessionStore;
//! use llmbridge::Role;
//!
//! let store = SessionStore::new();
//! store.append("abc123", Role::User, "Hello");
//! store.append("abc123", Role::Assistant, "Hi there");
//! assert_eq!(store.get("abc123").len(), 2);
//!
//! store.clear("abc123");
//! assert!(store.get("abc123").is_empty());
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::llmbridge::client_wrapper::{Role, Turn};

/// Number of turns retained per session.
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Thread-safe map from session id to bounded turn history.
///
/// All mutations happen inside one lock, so an append and its truncation are a single
/// atomic step even when requests for the same session run in parallel.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Vec<Turn>>>,
    max_turns: usize,
}

impl SessionStore {
    /// Create an empty store retaining [`DEFAULT_MAX_TURNS`] turns per session.
    pub fn new() -> Self {
        Self::with_max_turns(DEFAULT_MAX_TURNS)
    }

    /// Create an empty store with a custom per-session cap (minimum 1).
    pub fn with_max_turns(max_turns: usize) -> Self {
        SessionStore {
            sessions: Mutex::new(HashMap::new()),
            max_turns: max_turns.max(1),
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Snapshot of the history for `session_id`, creating an empty session on first access.
    pub fn get(&self, session_id: &str) -> Vec<Turn> {
        let mut sessions = self.lock();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(Vec::new)
            .clone()
    }

    /// Snapshot of the history for `session_id` without creating an entry.
    pub fn snapshot(&self, session_id: &str) -> Vec<Turn> {
        self.lock().get(session_id).cloned().unwrap_or_default()
    }

    /// Append one turn, then drop the oldest turns beyond the cap.
    ///
    /// Only user and assistant turns are stored; the preamble is never part of history, so
    /// a [`Role::System`] turn is dropped.
    pub fn append(&self, session_id: &str, role: Role, content: impl Into<String>) {
        if role == Role::System {
            log::warn!(
                "SessionStore::append(...): ignoring system turn for session {}",
                session_id
            );
            return;
        }
        let mut sessions = self.lock();
        let history = sessions
            .entry(session_id.to_string())
            .or_insert_with(Vec::new);
        history.push(Turn::new(role, content));
        truncate_to_recent(history, self.max_turns);
    }

    /// Record a completed question/answer pair in one critical section.
    pub fn record_exchange(&self, session_id: &str, question: &str, answer: &str) {
        let mut sessions = self.lock();
        let history = sessions
            .entry(session_id.to_string())
            .or_insert_with(Vec::new);
        history.push(Turn::user(question));
        history.push(Turn::assistant(answer));
        truncate_to_recent(history, self.max_turns);
    }

    /// Forget `session_id`. Clearing an unknown id is a no-op.
    pub fn clear(&self, session_id: &str) {
        if self.lock().remove(session_id).is_some() {
            log::debug!("SessionStore::clear(...): removed session {}", session_id);
        }
    }

    /// Whether the store currently holds an entry for `session_id`.
    pub fn contains(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    /// Number of sessions currently held.
    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Turn>>> {
        // A panic while holding the lock cannot leave a history longer than the cap,
        // so a poisoned map is still consistent.
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_to_recent(history: &mut Vec<Turn>, max_turns: usize) {
    if history.len() > max_turns {
        let excess = history.len() - max_turns;
        history.drain(..excess);
    }
}
