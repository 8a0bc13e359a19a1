//! The full question-to-summary pipeline.

use std::sync::Arc;

use serde_json::Value;

use df_domain::chat::Message;
use df_domain::error::{Error, Result};
use df_providers::{ChatRequest, LlmProvider};

use crate::catalog::MetricCatalog;
use crate::client::PrometheusClient;
use crate::promql;

/// Answers natural-language monitoring questions.
pub struct MetricsPipeline {
    catalog: MetricCatalog,
    prom: PrometheusClient,
    provider: Arc<dyn LlmProvider>,
    model: Option<String>,
}

impl MetricsPipeline {
    pub fn new(
        catalog: MetricCatalog,
        prom: PrometheusClient,
        provider: Arc<dyn LlmProvider>,
        model: Option<String>,
    ) -> Self {
        Self {
            catalog,
            prom,
            provider,
            model,
        }
    }

    /// generate -> validate -> execute -> summarize.
    pub async fn answer(&self, user_query: &str) -> Result<String> {
        let promql = self.generate_query(user_query).await?;
        tracing::info!(query = %promql, "generated PromQL");

        promql::validate(&promql)?;

        let result = if promql::has_range_selector(&promql) {
            self.prom.query_range(&promql).await?
        } else {
            self.prom.query(&promql).await?
        };

        self.summarize(user_query, &promql, &result).await
    }

    async fn generate_query(&self, user_query: &str) -> Result<String> {
        let prompt = promql::generation_prompt(user_query, &self.catalog);
        let resp = self
            .provider
            .chat(&ChatRequest {
                messages: vec![Message::user(prompt)],
                model: self.model.clone(),
                temperature: Some(0.2),
                max_tokens: Some(150),
            })
            .await?;

        let promql = promql::clean_query(&resp.content);
        if promql.is_empty() {
            return Err(Error::Metrics("failed to generate a PromQL query".into()));
        }
        Ok(promql)
    }

    async fn summarize(&self, user_query: &str, promql: &str, result: &Value) -> Result<String> {
        let result_text = serde_json::to_string_pretty(result)?;
        let prompt = format!(
            r#"You are a helpful assistant that explains Prometheus query results in plain English.

User Query: {user_query}
PromQL Query: {promql}

Query Result:
{result_text}

Summarize the result in simple terms."#
        );

        let resp = self
            .provider
            .chat(&ChatRequest {
                messages: vec![Message::user(prompt)],
                model: self.model.clone(),
                temperature: Some(0.4),
                max_tokens: Some(300),
            })
            .await?;

        Ok(resp.content.trim().to_string())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use df_domain::stream::{BoxStream, StreamEvent};
    use df_providers::ChatResponse;

    /// Provider that returns queued responses in order.
    struct QueueProvider {
        responses: std::sync::Mutex<Vec<String>>,
    }

    impl QueueProvider {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: std::sync::Mutex::new(
                    responses.into_iter().rev().map(String::from).collect(),
                ),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for QueueProvider {
        async fn chat(&self, _req: &ChatRequest) -> Result<ChatResponse> {
            let content = self
                .responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_default();
            Ok(ChatResponse {
                content,
                model: "queued".into(),
                finish_reason: Some("stop".into()),
            })
        }

        async fn chat_stream(
            &self,
            _req: &ChatRequest,
        ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
            Ok(Box::pin(futures_util::stream::empty()))
        }

        fn provider_id(&self) -> &str {
            "queued"
        }
    }

    fn test_catalog() -> MetricCatalog {
        MetricCatalog::from_reader(
            "metric_name,description,example_usage\napi_calls_failed_total,Failed calls,x\n"
                .as_bytes(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn empty_generated_query_is_an_error() {
        let pipeline = MetricsPipeline::new(
            test_catalog(),
            PrometheusClient::new(&df_domain::config::MetricsConfig::default()).unwrap(),
            Arc::new(QueueProvider::new(vec!["```\n```"])),
            None,
        );
        let err = pipeline.answer("how many failures?").await.unwrap_err();
        assert!(err.to_string().contains("failed to generate"));
    }

    #[tokio::test]
    async fn invalid_generated_query_is_rejected_before_execution() {
        let pipeline = MetricsPipeline::new(
            test_catalog(),
            PrometheusClient::new(&df_domain::config::MetricsConfig::default()).unwrap(),
            Arc::new(QueueProvider::new(vec!["sum(api_calls_failed_total)[24h]"])),
            None,
        );
        let err = pipeline.answer("failures in the last day?").await.unwrap_err();
        assert!(err.to_string().contains("invalid PromQL"));
    }
}
