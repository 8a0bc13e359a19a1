//! Startup wiring: config -> shared application state.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use df_cluster::ClusterOps;
use df_dialogue::{DialogueEngine, SessionRegistry};
use df_domain::config::Config;
use df_metrics::{MetricCatalog, MetricsPipeline, PrometheusClient};
use df_providers::ProviderRegistry;

use crate::state::AppState;

/// Build the shared [`AppState`] from the loaded configuration.
///
/// Degrades rather than aborts: a missing LLM provider or metrics
/// catalog disables the corresponding endpoint with a warning, so the
/// rest of the gateway still serves.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let llm = Arc::new(ProviderRegistry::from_config(&config.llm)?);

    let dialogue = match llm.resolve(config.dialogue.provider.as_deref()) {
        Ok(provider) => Some(Arc::new(DialogueEngine::new(
            provider,
            config.dialogue.model.clone(),
            Duration::from_millis(config.llm.request_timeout_ms),
            config.dialogue.reply_payload,
        ))),
        Err(e) => {
            tracing::warn!(error = %e, "dialogue disabled: no usable LLM provider");
            None
        }
    };

    let metrics = build_metrics(&config, &llm);

    Ok(AppState {
        sessions: Arc::new(SessionRegistry::new()),
        dialogue,
        cluster: Arc::new(ClusterOps::new(config.cluster.clone())),
        metrics,
        api_token_hash: read_api_token_hash(&config.server.api_token_env),
        llm,
        config,
    })
}

fn build_metrics(config: &Config, llm: &Arc<ProviderRegistry>) -> Option<Arc<MetricsPipeline>> {
    if !config.metrics.enabled {
        tracing::info!("metrics endpoint disabled by config");
        return None;
    }

    let provider = match llm.resolve(config.metrics.provider.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "metrics disabled: no usable LLM provider");
            return None;
        }
    };

    let catalog = match MetricCatalog::load(Path::new(&config.metrics.catalog_path)) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "metrics disabled: catalog unavailable");
            return None;
        }
    };

    let prom = match PrometheusClient::new(&config.metrics) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "metrics disabled: prometheus client init failed");
            return None;
        }
    };

    Some(Arc::new(MetricsPipeline::new(
        catalog,
        prom,
        provider,
        config.metrics.model.clone(),
    )))
}

/// Read the WS pre-shared token from the configured env var and hash it.
/// Absent or empty means open access (dev mode).
fn read_api_token_hash(env_var: &str) -> Option<Vec<u8>> {
    match std::env::var(env_var) {
        Ok(token) if !token.trim().is_empty() => {
            Some(Sha256::digest(token.trim().as_bytes()).to_vec())
        }
        _ => {
            tracing::warn!(
                env_var = %env_var,
                "no WS token configured — endpoints are unauthenticated"
            );
            None
        }
    }
}
