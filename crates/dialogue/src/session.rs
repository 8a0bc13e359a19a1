//! Per-connection session state: the accumulated configuration fields
//! and the conversation history.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use df_domain::chat::{Message, Role};

use crate::fields::{FieldState, REQUIRED_KEYS};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The accumulated configuration: one [`FieldState`] per required key,
/// plus any extra keys the model volunteered (adopted once, like the
/// required ones).
#[derive(Debug, Clone)]
pub struct SessionState {
    values: BTreeMap<String, FieldState>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let values = REQUIRED_KEYS
            .iter()
            .map(|k| (k.to_string(), FieldState::Unset))
            .collect();
        Self { values }
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(FieldState::is_set)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).and_then(FieldState::value)
    }

    /// Adopt a value. The merge guards the at-most-once rule; this is
    /// the raw transition.
    pub(crate) fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), FieldState::Set(value));
    }

    /// Count of required keys currently set.
    pub fn set_count(&self) -> usize {
        REQUIRED_KEYS.iter().filter(|k| self.is_set(k)).count()
    }

    /// True when every required key is set.
    pub fn is_complete(&self) -> bool {
        self.set_count() == REQUIRED_KEYS.len()
    }

    pub fn phase(&self) -> Phase {
        match self.set_count() {
            0 => Phase::Empty,
            n if n == REQUIRED_KEYS.len() => Phase::Complete,
            _ => Phase::InProgress,
        }
    }

    /// The full accumulated state as a wire object: every required key
    /// present (null when unset) plus all adopted extras.
    pub fn full_context(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for key in REQUIRED_KEYS {
            out.insert(
                key.to_string(),
                self.get(key).cloned().unwrap_or(Value::Null),
            );
        }
        for (key, state) in &self.values {
            if let FieldState::Set(value) = state {
                out.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        out
    }

    /// The subset embedded in the prompt: only required keys that are
    /// set. Extras and unset keys never leak into the instruction text.
    pub fn prompt_context(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for key in REQUIRED_KEYS {
            if let Some(value) = self.get(key) {
                out.insert(key.to_string(), value.clone());
            }
        }
        out
    }
}

/// Where a session stands in the dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No fields set yet.
    Empty,
    /// Some but not all fields set.
    InProgress,
    /// All fields set. Terminal.
    Complete,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One live conversation: accumulated state plus turn history. Created
/// at connect, evicted at disconnect, never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub state: SessionState,
    /// Append-only turn log, insertion order significant. Only mutated
    /// by a completed turn; failed turns leave it untouched.
    history: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: String) -> Self {
        let now = Utc::now();
        Self {
            token,
            state: SessionState::new(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record one completed turn.
    pub fn record_turn(&mut self, user_text: &str, assistant_text: &str) {
        self.history.push(Message::user(user_text));
        self.history.push(Message::assistant(assistant_text));
        self.updated_at = Utc::now();
    }

    /// Assistant turns only, in order. Prior user turns are never
    /// replayed to the model beyond the current one.
    pub fn assistant_history(&self) -> Vec<Message> {
        self.history
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .cloned()
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
