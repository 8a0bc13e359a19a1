pub mod health;
pub mod ws;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/v1/dialogue/ws", get(ws::dialogue_ws))
        .route("/v1/cluster/ws", get(ws::cluster_ws))
        .route("/v1/metrics/ws", get(ws::metrics_ws))
}
