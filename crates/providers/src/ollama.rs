//! Ollama adapter.
//!
//! Speaks the single-prompt `/api/generate` contract: the conversation
//! is flattened into one prompt string, the response arrives as
//! newline-delimited JSON objects with the text fragment in a flat
//! `response` field, and `"done": true` marks the terminal chunk.

use serde_json::Value;

use df_domain::chat::{Message, Role};
use df_domain::config::ProviderConfig;
use df_domain::error::{Error, Result};
use df_domain::stream::{BoxStream, StreamEvent};

use crate::stream::{response_stream, Framing};
use crate::traits::{ChatRequest, ChatResponse, LlmProvider};
use crate::util::from_reqwest;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An LLM adapter for a local or remote Ollama instance.
pub struct OllamaProvider {
    id: String,
    base_url: String,
    default_model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let default_model = cfg.default_model.clone().unwrap_or_else(|| "llama3".into());

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            default_model,
            client,
        })
    }

    fn build_body(&self, req: &ChatRequest, stream: bool) -> Value {
        let mut body = serde_json::json!({
            "model": req.model.clone().unwrap_or_else(|| self.default_model.clone()),
            "prompt": flatten_messages(&req.messages),
            "stream": stream,
        });

        let mut options = serde_json::Map::new();
        if let Some(temp) = req.temperature {
            options.insert("temperature".into(), serde_json::json!(temp));
        }
        if let Some(max) = req.max_tokens {
            options.insert("num_predict".into(), serde_json::json!(max));
        }
        if !options.is_empty() {
            body["options"] = Value::Object(options);
        }
        body
    }
}

/// Flatten a message list into the single prompt string this contract
/// expects. System text leads, then the turns in order, then an open
/// assistant cue.
fn flatten_messages(messages: &[Message]) -> String {
    let mut prompt = String::new();

    for msg in messages {
        match msg.role {
            Role::System => {
                prompt.push_str(&msg.content);
                prompt.push_str("\n\n");
            }
            Role::User => {
                prompt.push_str("User: ");
                prompt.push_str(&msg.content);
                prompt.push('\n');
            }
            Role::Assistant => {
                prompt.push_str("Assistant: ");
                prompt.push_str(&msg.content);
                prompt.push('\n');
            }
        }
    }

    prompt.push_str("Assistant: ");
    prompt
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse one NDJSON line into stream events.
///
/// Malformed lines are skipped (logged at debug), never fatal.
fn parse_ndjson_payload(data: &str) -> Vec<StreamEvent> {
    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, payload = %data, "skipping malformed stream line");
            return Vec::new();
        }
    };

    let mut events = Vec::new();

    if let Some(text) = v.get("response").and_then(|r| r.as_str()) {
        if !text.is_empty() {
            events.push(StreamEvent::Token { text: text.to_string() });
        }
    }

    if v.get("done").and_then(|d| d.as_bool()).unwrap_or(false) {
        let finish_reason = v
            .get("done_reason")
            .and_then(|r| r.as_str())
            .map(String::from);
        events.push(StreamEvent::Done { finish_reason });
    }

    events
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/api/generate", self.base_url);
        let body = self.build_body(req, false);

        tracing::debug!(provider = %self.id, url = %url, "ollama chat request");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let v: Value = serde_json::from_str(&resp_text)?;
        let content = v
            .get("response")
            .and_then(|r| r.as_str())
            .ok_or_else(|| Error::Provider {
                provider: self.id.clone(),
                message: "no 'response' field in reply".into(),
            })?
            .to_string();

        Ok(ChatResponse {
            content,
            model: v
                .get("model")
                .and_then(|m| m.as_str())
                .unwrap_or(&self.default_model)
                .to_string(),
            finish_reason: v
                .get("done_reason")
                .and_then(|r| r.as_str())
                .map(String::from),
        })
    }

    async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let url = format!("{}/api/generate", self.base_url);
        let body = self.build_body(req, true);

        tracing::debug!(provider = %self.id, url = %url, "ollama stream request");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), err_text),
            });
        }

        Ok(response_stream(resp, Framing::Ndjson, parse_ndjson_payload))
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndjson_payload_extracts_response_fragment() {
        let events = parse_ndjson_payload(r#"{"response":"Hel","done":false}"#);
        assert!(matches!(&events[0], StreamEvent::Token { text } if text == "Hel"));
    }

    #[test]
    fn ndjson_payload_done_emits_terminal_event() {
        let events = parse_ndjson_payload(r#"{"response":"","done":true,"done_reason":"stop"}"#);
        assert_eq!(events.len(), 1);
        assert!(
            matches!(&events[0], StreamEvent::Done { finish_reason: Some(r) } if r == "stop")
        );
    }

    #[test]
    fn ndjson_payload_final_fragment_and_done_in_one_line() {
        let events = parse_ndjson_payload(r#"{"response":"!","done":true}"#);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], StreamEvent::Token { text } if text == "!"));
        assert!(matches!(&events[1], StreamEvent::Done { .. }));
    }

    #[test]
    fn ndjson_payload_malformed_is_skipped() {
        assert!(parse_ndjson_payload("garbage line").is_empty());
    }

    #[test]
    fn flatten_orders_system_then_turns() {
        let messages = vec![
            Message::system("You are a helper."),
            Message::assistant("Hi! What do you need?"),
            Message::user("make me a dataset"),
        ];
        let prompt = flatten_messages(&messages);
        assert!(prompt.starts_with("You are a helper.\n\n"));
        assert!(prompt.contains("Assistant: Hi! What do you need?\n"));
        assert!(prompt.contains("User: make me a dataset\n"));
        assert!(prompt.ends_with("Assistant: "));
    }
}
