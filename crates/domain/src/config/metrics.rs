use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Metrics Q&A (Prometheus)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// When false, the metrics WS endpoint answers every request with an
    /// error instead of loading the catalog at startup.
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Prometheus HTTP API root, e.g. `http://localhost:9090/api/v1`.
    #[serde(default = "d_prom_url")]
    pub base_url: String,
    /// CSV file describing the queryable metric vocabulary.
    #[serde(default = "d_catalog")]
    pub catalog_path: String,
    /// Lookback window for range queries, in hours.
    #[serde(default = "d_24")]
    pub range_window_hours: u32,
    /// Resolution step for range queries.
    #[serde(default = "d_step")]
    pub step: String,
    /// Provider id used for query generation and summarization. Falls
    /// back to `llm.default_provider`.
    #[serde(default)]
    pub provider: Option<String>,
    /// Model override for the metrics calls.
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: d_prom_url(),
            catalog_path: d_catalog(),
            range_window_hours: 24,
            step: d_step(),
            provider: None,
            model: None,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_true() -> bool {
    true
}
fn d_prom_url() -> String {
    "http://localhost:9090/api/v1".into()
}
fn d_catalog() -> String {
    "metrics.csv".into()
}
fn d_24() -> u32 {
    24
}
fn d_step() -> String {
    "60s".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_defaults() {
        let cfg = MetricsConfig::default();
        assert!(cfg.enabled);
        assert_eq!(cfg.base_url, "http://localhost:9090/api/v1");
        assert_eq!(cfg.catalog_path, "metrics.csv");
        assert_eq!(cfg.range_window_hours, 24);
        assert_eq!(cfg.step, "60s");
    }
}
