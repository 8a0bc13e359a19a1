use std::sync::Arc;

use df_cluster::ClusterOps;
use df_dialogue::{DialogueEngine, SessionRegistry};
use df_domain::config::Config;
use df_metrics::MetricsPipeline;
use df_providers::ProviderRegistry;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: Arc<ProviderRegistry>,
    pub sessions: Arc<SessionRegistry>,
    /// `None` when no LLM provider initialized; dialogue turns then
    /// answer with an error instead of crashing the connection.
    pub dialogue: Option<Arc<DialogueEngine>>,
    pub cluster: Arc<ClusterOps>,
    /// `None` when metrics is disabled or its catalog/provider is
    /// unavailable.
    pub metrics: Option<Arc<MetricsPipeline>>,
    /// SHA-256 hash of the WS pre-shared token (read once at startup).
    /// `None` = dev mode (no auth enforced).
    pub api_token_hash: Option<Vec<u8>>,
}
