use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM backend system
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider used when a caller does not name one. When `None`, the
    /// first successfully initialized provider is used.
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Call-level bound on one model request, streaming included.
    #[serde(default = "d_90000u")]
    pub request_timeout_ms: u64,
    /// Registered LLM backends (data-driven: adding a backend = adding config).
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: None,
            request_timeout_ms: 90_000,
            providers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Chat-completions contract: message list, SSE stream, fragment at
    /// `choices[0].delta.content`.
    OpenaiCompat,
    /// Single-prompt contract: NDJSON stream, fragment at `response`.
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Env var containing the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Direct key (for config-only setups; prefer env).
    #[serde(default)]
    pub key: Option<String>,
    /// Header name (e.g. "Authorization").
    #[serde(default)]
    pub header: Option<String>,
    /// Header value prefix (e.g. "Bearer ").
    #[serde(default)]
    pub prefix: Option<String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_90000u() -> u64 {
    90_000
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_config_default_timeout() {
        let cfg = LlmConfig::default();
        assert_eq!(cfg.request_timeout_ms, 90_000);
        assert!(cfg.default_provider.is_none());
    }

    #[test]
    fn provider_config_parses_both_kinds() {
        let cfg: LlmConfig = toml::from_str(
            r#"
            [[providers]]
            id = "openai"
            kind = "openai_compat"
            base_url = "https://api.openai.com/v1"
            default_model = "gpt-4o"

            [providers.auth]
            env = "OPENAI_API_KEY"

            [[providers]]
            id = "local"
            kind = "ollama"
            base_url = "http://localhost:11434"
            default_model = "llama3"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.providers.len(), 2);
        assert_eq!(cfg.providers[0].kind, ProviderKind::OpenaiCompat);
        assert_eq!(cfg.providers[0].auth.env.as_deref(), Some("OPENAI_API_KEY"));
        assert_eq!(cfg.providers[1].kind, ProviderKind::Ollama);
    }
}
