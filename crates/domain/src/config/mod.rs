mod cluster;
mod dialogue;
mod llm;
mod metrics;
mod server;

pub use cluster::*;
pub use dialogue::*;
pub use llm::*;
pub use metrics::*;
pub use server::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub dialogue: DialogueConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.llm.providers.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "llm.providers".into(),
                message: "no LLM providers configured; dialogue turns will fail".into(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for pc in &self.llm.providers {
            if pc.id.trim().is_empty() {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: "llm.providers".into(),
                    message: "provider id must not be empty".into(),
                });
            }
            if !seen.insert(pc.id.clone()) {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: "llm.providers".into(),
                    message: format!("duplicate provider id '{}'", pc.id),
                });
            }
            if pc.base_url.trim().is_empty() {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers.{}.base_url", pc.id),
                    message: "base_url must not be empty".into(),
                });
            }
        }

        if let Some(ref default) = self.llm.default_provider {
            if !self.llm.providers.iter().any(|p| &p.id == default) {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: "llm.default_provider".into(),
                    message: format!("'{default}' does not match any configured provider"),
                });
            }
        }

        if self.llm.request_timeout_ms == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "llm.request_timeout_ms".into(),
                message: "must be greater than zero".into(),
            });
        }

        if self.metrics.enabled && self.metrics.catalog_path.trim().is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "metrics.catalog_path".into(),
                message: "metrics is enabled but catalog_path is empty".into(),
            });
        }

        issues
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_all_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.server.port, 8000);
        assert!(cfg.llm.providers.is_empty());
    }

    #[test]
    fn validate_flags_duplicate_provider_ids() {
        let cfg: Config = toml::from_str(
            r#"
            [[llm.providers]]
            id = "main"
            kind = "openai_compat"
            base_url = "https://api.openai.com/v1"

            [[llm.providers]]
            id = "main"
            kind = "ollama"
            base_url = "http://localhost:11434"
            "#,
        )
        .unwrap();
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.message.contains("duplicate")));
    }

    #[test]
    fn validate_flags_unknown_default_provider() {
        let cfg: Config = toml::from_str(
            r#"
            [llm]
            default_provider = "missing"

            [[llm.providers]]
            id = "main"
            kind = "openai_compat"
            base_url = "https://api.openai.com/v1"
            "#,
        )
        .unwrap();
        let issues = cfg.validate();
        assert!(issues.iter().any(|i| i.field == "llm.default_provider"));
    }

    #[test]
    fn validate_warns_on_no_providers() {
        let cfg = Config::default();
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Warning && i.field == "llm.providers"));
    }
}
