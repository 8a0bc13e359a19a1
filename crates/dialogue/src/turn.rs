//! One dialogue turn, end to end.
//!
//! Snapshot the session under its lock, build the prompt, run the
//! bounded streaming model call with the lock released, recover and
//! normalize the candidate response, then re-lock to merge and append
//! history. A turn that fails at any stage leaves the session exactly
//! as it was.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use df_domain::chat::Message;
use df_domain::config::ReplyPayload;
use df_domain::error::{Error, Result};
use df_providers::{collect_text, ChatRequest, LlmProvider};

use crate::extract::extract_json;
use crate::merge::merge_context;
use crate::normalize::normalize_context;
use crate::prompt::build_prompt;
use crate::store::SessionHandle;

/// Fixed message sent when the final field lands, regardless of what
/// the model said that turn.
pub const COMPLETION_MESSAGE: &str = "All steps complete! Here's your full configuration.";

/// Advisory prefix when a repair (lenient JSON parse or stringified
/// sample coercion) silently succeeded.
pub const REPAIR_NOTICE: &str =
    "I noticed your input had some formatting issues, so I auto-corrected the JSON for you. ";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn reply
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The outgoing message for one successful turn.
#[derive(Debug, Clone)]
pub enum TurnReply {
    /// Normal turn carrying the full accumulated state.
    Turn {
        message: String,
        context: Map<String, Value>,
    },
    /// Normal turn carrying only this turn's adopted keys.
    Delta {
        message: String,
        delta: Map<String, Value>,
    },
    /// Every field is set; the message is [`COMPLETION_MESSAGE`].
    Complete {
        message: String,
        context: Map<String, Value>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Drives dialogue turns against one model backend.
pub struct DialogueEngine {
    provider: Arc<dyn LlmProvider>,
    model: Option<String>,
    timeout: Duration,
    reply_payload: ReplyPayload,
}

impl DialogueEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: Option<String>,
        timeout: Duration,
        reply_payload: ReplyPayload,
    ) -> Self {
        Self {
            provider,
            model,
            timeout,
            reply_payload,
        }
    }

    /// Process one user turn for `session`.
    ///
    /// The session lock is never held across the model call; dropping
    /// the returned future (e.g. on disconnect) cancels the in-flight
    /// request without having touched the session.
    pub async fn run_turn(&self, session: &SessionHandle, user_input: &str) -> Result<TurnReply> {
        let (prompt_context, assistant_history) = {
            let s = session.lock();
            (s.state.prompt_context(), s.assistant_history())
        };

        let system_prompt = build_prompt(&prompt_context, user_input);
        let mut messages = Vec::with_capacity(assistant_history.len() + 2);
        messages.push(Message::system(system_prompt));
        messages.extend(assistant_history);
        messages.push(Message::user(user_input));

        let req = ChatRequest {
            messages,
            model: self.model.clone(),
            ..Default::default()
        };

        let raw = tokio::time::timeout(self.timeout, async {
            let stream = self.provider.chat_stream(&req).await?;
            collect_text(stream).await
        })
        .await
        .map_err(|_| {
            Error::Timeout(format!(
                "model call exceeded {}ms",
                self.timeout.as_millis()
            ))
        })??;

        tracing::debug!(
            provider = %self.provider.provider_id(),
            bytes = raw.len(),
            "model stream collected"
        );

        let extraction = extract_json(&raw);
        if extraction.is_empty() {
            return Err(Error::Extraction);
        }

        let model_message = extraction
            .object
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let mut context = match extraction.object.get("context") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        let sample_repaired = normalize_context(&mut context);

        let message = if extraction.repaired || sample_repaired {
            format!("{REPAIR_NOTICE}{model_message}")
        } else {
            model_message.clone()
        };

        let mut s = session.lock();
        let outcome = merge_context(&mut s.state, &context);
        s.record_turn(user_input, &model_message);

        tracing::info!(
            session = %s.token,
            adopted = outcome.delta.len(),
            set_count = s.state.set_count(),
            phase = ?s.state.phase(),
            "turn merged"
        );

        if outcome.complete {
            return Ok(TurnReply::Complete {
                message: COMPLETION_MESSAGE.to_string(),
                context: s.state.full_context(),
            });
        }

        Ok(match self.reply_payload {
            ReplyPayload::Full => TurnReply::Turn {
                message,
                context: s.state.full_context(),
            },
            ReplyPayload::Delta => TurnReply::Delta {
                message,
                delta: outcome.delta,
            },
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
