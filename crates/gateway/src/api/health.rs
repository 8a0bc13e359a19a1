use axum::extract::State;
use axum::response::Json;

use crate::state::AppState;

/// GET /healthz — liveness plus a coarse readiness picture.
pub async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.sessions.len(),
        "providers": state.llm.list_providers(),
        "dialogue_ready": state.dialogue.is_some(),
        "metrics_ready": state.metrics.is_some(),
    }))
}
