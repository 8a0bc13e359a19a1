use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dialogue
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DialogueConfig {
    /// Provider id used for dialogue turns. Falls back to
    /// `llm.default_provider`, then to the first initialized provider.
    #[serde(default)]
    pub provider: Option<String>,
    /// Model override passed to the provider. `None` uses the provider's
    /// configured default model.
    #[serde(default)]
    pub model: Option<String>,
    /// Shape of the state object attached to a normal turn reply:
    /// the full accumulated context, or just this turn's adopted keys.
    #[serde(default)]
    pub reply_payload: ReplyPayload,
}

/// Wire shape of the per-turn state payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReplyPayload {
    /// `{"message": ..., "context": <full accumulated state>}`
    #[default]
    Full,
    /// `{"message": ..., "delta": <keys adopted this turn>}`
    Delta,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialogue_default_uses_full_payload() {
        let cfg = DialogueConfig::default();
        assert_eq!(cfg.reply_payload, ReplyPayload::Full);
        assert!(cfg.provider.is_none());
    }

    #[test]
    fn dialogue_parses_delta_payload() {
        let cfg: DialogueConfig = toml::from_str(r#"reply_payload = "delta""#).unwrap();
        assert_eq!(cfg.reply_payload, ReplyPayload::Delta);
    }
}
