//! Provider registry.
//!
//! Constructs and holds all configured LLM backend instances. At startup
//! the registry reads the [`LlmConfig`], resolves authentication (env
//! vars, direct keys), and instantiates the appropriate adapter for each
//! configured backend. Backends that fail to initialize are logged and
//! skipped rather than aborting startup.

use std::collections::HashMap;
use std::sync::Arc;

use df_domain::config::{LlmConfig, ProviderKind};
use df_domain::error::{Error, Result};

use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Holds all instantiated LLM backends.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    /// Resolution order for `default()`: the configured default id, else
    /// the first provider in config order that initialized.
    default_id: Option<String>,
}

impl ProviderRegistry {
    /// Build the registry from the application's [`LlmConfig`].
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        let mut first_ok: Option<String> = None;

        for pc in &config.providers {
            let result: Result<Arc<dyn LlmProvider>> = match pc.kind {
                ProviderKind::OpenaiCompat => OpenAiCompatProvider::from_config(pc)
                    .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
                ProviderKind::Ollama => OllamaProvider::from_config(pc)
                    .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
            };

            match result {
                Ok(provider) => {
                    tracing::info!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        "registered LLM provider"
                    );
                    first_ok.get_or_insert_with(|| pc.id.clone());
                    providers.insert(pc.id.clone(), provider);
                }
                Err(e) => {
                    tracing::warn!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        error = %e,
                        "failed to initialize LLM provider, skipping"
                    );
                }
            }
        }

        if providers.is_empty() && !config.providers.is_empty() {
            tracing::warn!(
                "no LLM providers initialized; dialogue and metrics endpoints \
                 will fail until auth is configured"
            );
        }

        let default_id = match &config.default_provider {
            Some(id) if providers.contains_key(id) => Some(id.clone()),
            Some(id) => {
                tracing::warn!(
                    provider_id = %id,
                    "configured default provider not available, falling back"
                );
                first_ok
            }
            None => first_ok,
        };

        Ok(Self {
            providers,
            default_id,
        })
    }

    /// Look up a provider by its config id.
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// The default provider, if any initialized.
    pub fn default(&self) -> Option<Arc<dyn LlmProvider>> {
        self.default_id.as_deref().and_then(|id| self.get(id))
    }

    /// Resolve an optional provider id to an instance, falling back to
    /// the default. Errors when nothing matches.
    pub fn resolve(&self, provider_id: Option<&str>) -> Result<Arc<dyn LlmProvider>> {
        match provider_id {
            Some(id) => self.get(id).ok_or_else(|| {
                Error::Config(format!("LLM provider '{id}' is not configured"))
            }),
            None => self
                .default()
                .ok_or_else(|| Error::Config("no LLM provider available".into())),
        }
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// List all registered provider IDs (sorted).
    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use df_domain::config::{AuthConfig, ProviderConfig};

    fn ollama_cfg(id: &str) -> ProviderConfig {
        ProviderConfig {
            id: id.into(),
            kind: ProviderKind::Ollama,
            base_url: "http://localhost:11434".into(),
            auth: AuthConfig::default(),
            default_model: Some("llama3".into()),
        }
    }

    #[test]
    fn registry_empty_config_has_no_default() {
        let registry = ProviderRegistry::from_config(&LlmConfig::default()).unwrap();
        assert!(registry.is_empty());
        assert!(registry.default().is_none());
        assert!(registry.resolve(None).is_err());
    }

    #[test]
    fn registry_first_provider_becomes_default() {
        let config = LlmConfig {
            providers: vec![ollama_cfg("a"), ollama_cfg("b")],
            ..Default::default()
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.default().unwrap().provider_id(), "a");
    }

    #[test]
    fn registry_honors_configured_default() {
        let config = LlmConfig {
            default_provider: Some("b".into()),
            providers: vec![ollama_cfg("a"), ollama_cfg("b")],
            ..Default::default()
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.default().unwrap().provider_id(), "b");
    }

    #[test]
    fn registry_skips_provider_with_missing_env_key() {
        let config = LlmConfig {
            providers: vec![
                ProviderConfig {
                    id: "broken".into(),
                    kind: ProviderKind::OpenaiCompat,
                    base_url: "https://api.openai.com/v1".into(),
                    auth: AuthConfig {
                        env: Some("DF_TEST_REGISTRY_MISSING_KEY_9999".into()),
                        ..Default::default()
                    },
                    default_model: None,
                },
                ollama_cfg("ok"),
            ],
            ..Default::default()
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.default().unwrap().provider_id(), "ok");
    }

    #[test]
    fn resolve_unknown_id_is_an_error() {
        let config = LlmConfig {
            providers: vec![ollama_cfg("a")],
            ..Default::default()
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert!(registry.resolve(Some("missing")).is_err());
        assert!(registry.resolve(Some("a")).is_ok());
    }
}
