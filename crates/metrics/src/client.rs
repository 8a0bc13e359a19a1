//! Prometheus HTTP API client.
//!
//! Two entry points matching the two query endpoints: `query` for
//! instant vectors, `query_range` over a trailing window for queries
//! with a range selector.

use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use serde_json::Value;

use df_domain::config::MetricsConfig;
use df_domain::error::{Error, Result};

pub struct PrometheusClient {
    base_url: String,
    range_window_hours: u32,
    step: String,
    client: reqwest::Client,
}

impl PrometheusClient {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            range_window_hours: config.range_window_hours,
            step: config.step.clone(),
            client,
        })
    }

    /// Instant query: the current value of the expression.
    pub async fn query(&self, promql: &str) -> Result<Value> {
        let url = format!("{}/query", self.base_url);
        tracing::debug!(query = %promql, "prometheus instant query");
        self.get_result(&url, &[("query", promql)]).await
    }

    /// Range query over the trailing configured window.
    pub async fn query_range(&self, promql: &str) -> Result<Value> {
        let end = Utc::now();
        let start = end - ChronoDuration::hours(i64::from(self.range_window_hours));
        let url = format!("{}/query_range", self.base_url);

        tracing::debug!(query = %promql, window_hours = self.range_window_hours, "prometheus range query");

        self.get_result(
            &url,
            &[
                ("query", promql),
                ("start", &start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("end", &end.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("step", &self.step),
            ],
        )
        .await
    }

    async fn get_result(&self, url: &str, params: &[(&str, &str)]) -> Result<Value> {
        let resp = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Metrics(format!(
                "prometheus returned HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let v: Value = serde_json::from_str(&body)?;
        if v.get("status").and_then(|s| s.as_str()) != Some("success") {
            return Err(Error::Metrics(format!("prometheus query failed: {body}")));
        }

        v.get("data")
            .and_then(|d| d.get("result"))
            .cloned()
            .ok_or_else(|| Error::Metrics("no result set in prometheus response".into()))
    }
}
