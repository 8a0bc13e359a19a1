//! The never-overwrite merge.
//!
//! Each key in the normalized candidate context is adopted iff it is
//! currently unset in the session and the offered value is an actual
//! answer. Keys that are already set are silently discarded: later
//! turns cannot overwrite earlier answers through this path.

use serde_json::{Map, Value};

use crate::fields::is_answer;
use crate::session::SessionState;

/// Result of merging one candidate context into session state.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The keys actually adopted this turn, with their values.
    pub delta: Map<String, Value>,
    /// True iff every required key is now set.
    pub complete: bool,
}

/// Merge a normalized candidate context into `state`.
pub fn merge_context(state: &mut SessionState, incoming: &Map<String, Value>) -> MergeOutcome {
    let mut delta = Map::new();

    for (key, value) in incoming {
        if state.is_set(key) {
            continue;
        }
        if !is_answer(value) {
            continue;
        }
        state.set(key, value.clone());
        delta.insert(key.clone(), value.clone());
    }

    if !delta.is_empty() {
        tracing::debug!(
            adopted = ?delta.keys().collect::<Vec<_>>(),
            set_count = state.set_count(),
            "merged candidate context"
        );
    }

    MergeOutcome {
        delta,
        complete: state.is_complete(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
