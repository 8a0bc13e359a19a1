use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cluster operations (kubectl ai)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Binary invoked for cluster requests.
    #[serde(default = "d_kubectl")]
    pub binary: String,
    /// Value passed to `--llm-provider`.
    #[serde(default = "d_openai")]
    pub llm_provider: String,
    /// Value passed to `--model`.
    #[serde(default = "d_gpt41")]
    pub model: String,
    /// Env var that must hold the model credential before an invocation
    /// is attempted.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    /// Env var that must point at the kubeconfig.
    #[serde(default = "d_kubeconfig_env")]
    pub kubeconfig_env: String,
    /// Bound on one invocation, in seconds.
    #[serde(default = "d_120")]
    pub timeout_secs: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            binary: d_kubectl(),
            llm_provider: d_openai(),
            model: d_gpt41(),
            api_key_env: d_api_key_env(),
            kubeconfig_env: d_kubeconfig_env(),
            timeout_secs: 120,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_kubectl() -> String {
    "kubectl".into()
}
fn d_openai() -> String {
    "openai".into()
}
fn d_gpt41() -> String {
    "gpt-4.1".into()
}
fn d_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn d_kubeconfig_env() -> String {
    "KUBECONFIG".into()
}
fn d_120() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_defaults_match_kubectl_ai() {
        let cfg = ClusterConfig::default();
        assert_eq!(cfg.binary, "kubectl");
        assert_eq!(cfg.llm_provider, "openai");
        assert_eq!(cfg.model, "gpt-4.1");
        assert_eq!(cfg.api_key_env, "OPENAI_API_KEY");
        assert_eq!(cfg.kubeconfig_env, "KUBECONFIG");
        assert_eq!(cfg.timeout_secs, 120);
    }
}
