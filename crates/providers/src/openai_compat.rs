//! OpenAI-compatible adapter.
//!
//! Works with OpenAI, Azure-hosted deployments behind a compat proxy,
//! vLLM, LM Studio, Together, and any other endpoint that follows the
//! OpenAI chat completions contract. Streaming responses arrive as SSE
//! `data:` lines with the text fragment at `choices[0].delta.content`
//! and a `[DONE]` sentinel terminating the stream.

use serde_json::Value;

use df_domain::chat::Message;
use df_domain::config::ProviderConfig;
use df_domain::error::{Error, Result};
use df_domain::stream::{BoxStream, StreamEvent};

use crate::stream::{response_stream, Framing};
use crate::traits::{ChatRequest, ChatResponse, LlmProvider};
use crate::util::{from_reqwest, resolve_api_key};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An LLM adapter for any OpenAI-compatible API endpoint.
pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: Option<String>,
    auth_header: String,
    auth_prefix: String,
    default_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider from the deserialized provider config.
    ///
    /// Auth is resolved eagerly: a configured-but-missing env var fails
    /// here rather than on the first request.
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;
        let auth_header = cfg
            .auth
            .header
            .clone()
            .unwrap_or_else(|| "Authorization".into());
        let auth_prefix = cfg.auth.prefix.clone().unwrap_or_else(|| "Bearer ".into());
        let default_model = cfg.default_model.clone().unwrap_or_else(|| "gpt-4o".into());

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            auth_header,
            auth_prefix,
            default_model,
            client,
        })
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        if let Some(ref key) = self.api_key {
            builder = builder.header(
                &self.auth_header,
                format!("{}{}", self.auth_prefix, key),
            );
        }
        builder
    }

    fn build_chat_body(&self, req: &ChatRequest, stream: bool) -> Value {
        let messages: Vec<Value> = req.messages.iter().map(msg_to_openai).collect();

        let mut body = serde_json::json!({
            "model": req.model.clone().unwrap_or_else(|| self.default_model.clone()),
            "messages": messages,
            "stream": stream,
        });

        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max) = req.max_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }
        body
    }
}

fn msg_to_openai(msg: &Message) -> Value {
    serde_json::json!({
        "role": msg.role.as_str(),
        "content": msg.content,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_chat_response(body: &Value) -> Result<ChatResponse> {
    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| Error::Provider {
            provider: "openai_compat".into(),
            message: "no choices in response".into(),
        })?;

    let content = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .map(String::from);

    let model = body
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    Ok(ChatResponse {
        content,
        model,
        finish_reason,
    })
}

/// Parse one SSE `data:` payload into stream events.
///
/// Malformed payloads and chunks missing the expected structure are
/// skipped (logged at debug), never fatal.
fn parse_sse_payload(data: &str) -> Vec<StreamEvent> {
    if data.trim() == "[DONE]" {
        return vec![StreamEvent::Done { finish_reason: Some("stop".into()) }];
    }

    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, payload = %data, "skipping malformed stream line");
            return Vec::new();
        }
    };

    let choice = match v
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
    {
        Some(c) => c,
        None => {
            tracing::debug!(payload = %data, "skipping chunk without choices");
            return Vec::new();
        }
    };

    if let Some(fr) = choice.get("finish_reason").and_then(|f| f.as_str()) {
        return vec![StreamEvent::Done { finish_reason: Some(fr.to_string()) }];
    }

    match choice
        .get("delta")
        .and_then(|d| d.get("content"))
        .and_then(|v| v.as_str())
    {
        Some(text) if !text.is_empty() => vec![StreamEvent::Token { text: text.to_string() }],
        _ => {
            tracing::debug!(payload = %data, "skipping empty or incomplete delta");
            Vec::new()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(req, false);

        tracing::debug!(provider = %self.id, url = %url, "openai_compat chat request");

        let resp = self
            .authed_post(&url)
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

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_chat_response(&resp_json)
    }

    async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(req, true);

        tracing::debug!(provider = %self.id, url = %url, "openai_compat stream request");

        let resp = self
            .authed_post(&url)
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

        Ok(response_stream(resp, Framing::Sse, parse_sse_payload))
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
    fn sse_payload_extracts_delta_content() {
        let data = r#"{"choices":[{"delta":{"content":"Hello"}}]}"#;
        let events = parse_sse_payload(data);
        assert!(matches!(&events[0], StreamEvent::Token { text } if text == "Hello"));
    }

    #[test]
    fn sse_payload_done_sentinel() {
        let events = parse_sse_payload("[DONE]");
        assert!(matches!(&events[0], StreamEvent::Done { .. }));
    }

    #[test]
    fn sse_payload_finish_reason_ends_stream() {
        let data = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        let events = parse_sse_payload(data);
        assert!(
            matches!(&events[0], StreamEvent::Done { finish_reason: Some(r) } if r == "stop")
        );
    }

    #[test]
    fn sse_payload_malformed_json_is_skipped() {
        assert!(parse_sse_payload("{not json").is_empty());
    }

    #[test]
    fn sse_payload_empty_delta_is_skipped() {
        let data = r#"{"choices":[{"delta":{"content":""}}]}"#;
        assert!(parse_sse_payload(data).is_empty());
    }

    #[test]
    fn sse_payload_missing_choices_is_skipped() {
        assert!(parse_sse_payload(r#"{"usage":{"total_tokens":12}}"#).is_empty());
    }

    #[test]
    fn chat_response_parses_message_content() {
        let body: Value = serde_json::from_str(
            r#"{
                "model": "gpt-4o",
                "choices": [{"message": {"content": "hi"}, "finish_reason": "stop"}]
            }"#,
        )
        .unwrap();
        let resp = parse_chat_response(&body).unwrap();
        assert_eq!(resp.content, "hi");
        assert_eq!(resp.model, "gpt-4o");
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn chat_response_without_choices_is_an_error() {
        let body: Value = serde_json::from_str(r#"{"model": "gpt-4o"}"#).unwrap();
        assert!(parse_chat_response(&body).is_err());
    }
}
