//! WebSocket endpoints.
//!
//! Three independent conversations share one wire convention: inbound
//! frames decode to `{"message": <string>}`, outbound frames are a
//! reply object or `{"error": <string>}`. One notification per failed
//! turn, session state untouched, connection kept alive.
//!
//! The dialogue endpoint owns a session for the connection lifetime:
//! created on upgrade, evicted on disconnect. Turns are strictly
//! sequential — a frame arriving while a turn is in flight is buffered
//! (one slot; extras are dropped with a warning) — and a disconnect
//! mid-turn cancels the in-flight model call by dropping its future.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use df_domain::error::Error;
use df_dialogue::TurnReply;

use crate::state::AppState;

const ERR_EMPTY_MESSAGE: &str = "Empty message received";
const ERR_INVALID_JSON: &str = "Invalid JSON format";
const ERR_TIMEOUT: &str = "Request to AI provider timed out.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Auth
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Pre-shared token; required when the server has one configured.
    pub token: Option<String>,
}

/// Constant-time token check against the startup-computed hash.
/// Hashing normalizes lengths so `ct_eq` always compares 32 bytes.
fn authorized(state: &AppState, provided: Option<&str>) -> bool {
    match &state.api_token_hash {
        None => true,
        Some(expected) => {
            let digest = Sha256::digest(provided.unwrap_or("").as_bytes());
            digest.as_slice().ct_eq(expected.as_slice()).into()
        }
    }
}

fn unauthorized() -> axum::response::Response {
    (
        axum::http::StatusCode::UNAUTHORIZED,
        "invalid or missing token",
    )
        .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
struct Inbound {
    /// Missing field decodes as empty, which is then rejected as an
    /// empty message — matching the wire contract.
    #[serde(default)]
    message: String,
}

fn reply_to_wire(reply: &TurnReply) -> Value {
    match reply {
        TurnReply::Turn { message, context } | TurnReply::Complete { message, context } => {
            json!({ "message": message, "context": context })
        }
        TurnReply::Delta { message, delta } => {
            json!({ "message": message, "delta": delta })
        }
    }
}

/// Map a turn failure to its client-facing text. Timeouts get a
/// distinguishable message so the client can suggest retrying.
fn error_text(e: &Error) -> String {
    match e {
        Error::Timeout(_) => ERR_TIMEOUT.to_string(),
        other => other.to_string(),
    }
}

async fn send_json(socket: &mut WebSocket, value: &Value) -> Result<(), axum::Error> {
    socket.send(Message::Text(value.to_string())).await
}

async fn send_error(socket: &mut WebSocket, text: &str) -> Result<(), axum::Error> {
    send_json(socket, &json!({ "error": text })).await
}

/// Decode one inbound frame to a trimmed user message, reporting wire
/// errors to the client. `Ok(None)` means "reported, read next frame";
/// `Err(())` means the socket is gone.
async fn decode_inbound(socket: &mut WebSocket, text: &str) -> Result<Option<String>, ()> {
    let inbound: Inbound = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "undecodable inbound frame");
            return match send_error(socket, ERR_INVALID_JSON).await {
                Ok(()) => Ok(None),
                Err(_) => Err(()),
            };
        }
    };

    let message = inbound.message.trim().to_string();
    if message.is_empty() {
        return match send_error(socket, ERR_EMPTY_MESSAGE).await {
            Ok(()) => Ok(None),
            Err(_) => Err(()),
        };
    }

    Ok(Some(message))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dialogue endpoint
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET /v1/dialogue/ws — upgrade to the configuration dialogue.
pub async fn dialogue_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    if !authorized(&state, query.token.as_deref()) {
        return unauthorized();
    }
    ws.on_upgrade(move |socket| handle_dialogue(socket, state))
        .into_response()
}

async fn handle_dialogue(mut socket: WebSocket, state: AppState) {
    let engine = match &state.dialogue {
        Some(e) => e.clone(),
        None => {
            let _ = send_error(&mut socket, "no LLM provider configured").await;
            return;
        }
    };

    let (token, session) = state.sessions.create();
    tracing::info!(session = %token, "dialogue client connected");

    // One buffered frame: turns are sequential, but we keep reading the
    // socket while a turn runs so a disconnect cancels the model call.
    let mut pending: Option<String> = None;

    'conn: loop {
        let text = match pending.take() {
            Some(t) => t,
            None => match socket.recv().await {
                Some(Ok(Message::Text(t))) => t,
                Some(Ok(Message::Close(_))) | None => break 'conn,
                Some(Ok(_)) => continue 'conn,
                Some(Err(e)) => {
                    tracing::debug!(session = %token, error = %e, "socket error");
                    break 'conn;
                }
            },
        };

        let user_message = match decode_inbound(&mut socket, &text).await {
            Ok(Some(m)) => m,
            Ok(None) => continue 'conn,
            Err(()) => break 'conn,
        };

        let turn = engine.run_turn(&session, &user_message);
        tokio::pin!(turn);

        let result = loop {
            tokio::select! {
                res = &mut turn => break Some(res),
                frame = socket.recv() => match frame {
                    Some(Ok(Message::Text(t))) => {
                        if pending.is_none() {
                            pending = Some(t);
                        } else {
                            tracing::warn!(
                                session = %token,
                                "dropping frame received while a turn is in flight"
                            );
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break None,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(session = %token, error = %e, "socket error mid-turn");
                        break None;
                    }
                },
            }
        };

        let Some(result) = result else {
            // Disconnected mid-turn; dropping the future cancelled the
            // in-flight model call. Partial turn state was never merged.
            tracing::info!(session = %token, "client disconnected mid-turn");
            break 'conn;
        };

        let outbound = match result {
            Ok(reply) => reply_to_wire(&reply),
            Err(e) => {
                tracing::warn!(session = %token, error = %e, "turn failed");
                json!({ "error": error_text(&e) })
            }
        };

        if send_json(&mut socket, &outbound).await.is_err() {
            break 'conn;
        }
    }

    state.sessions.remove(&token);
    tracing::info!(session = %token, "dialogue client disconnected");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cluster endpoint
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET /v1/cluster/ws — natural-language cluster operations.
pub async fn cluster_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    if !authorized(&state, query.token.as_deref()) {
        return unauthorized();
    }
    ws.on_upgrade(move |socket| handle_cluster(socket, state))
        .into_response()
}

async fn handle_cluster(mut socket: WebSocket, state: AppState) {
    tracing::info!("cluster client connected");

    while let Some(Ok(msg)) = socket.recv().await {
        let text = match msg {
            Message::Text(t) => t,
            Message::Close(_) => break,
            _ => continue,
        };

        let user_message = match decode_inbound(&mut socket, &text).await {
            Ok(Some(m)) => m,
            Ok(None) => continue,
            Err(()) => break,
        };

        let outbound = match state.cluster.run(&user_message).await {
            Ok(output) => json!({ "type": "infra", "output": output }),
            Err(e) => {
                tracing::warn!(error = %e, "cluster request failed");
                json!({ "error": e.to_string() })
            }
        };

        if send_json(&mut socket, &outbound).await.is_err() {
            break;
        }
    }

    tracing::info!("cluster client disconnected");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Metrics endpoint
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET /v1/metrics/ws — natural-language monitoring questions.
pub async fn metrics_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    if !authorized(&state, query.token.as_deref()) {
        return unauthorized();
    }
    ws.on_upgrade(move |socket| handle_metrics(socket, state))
        .into_response()
}

async fn handle_metrics(mut socket: WebSocket, state: AppState) {
    tracing::info!("metrics client connected");

    while let Some(Ok(msg)) = socket.recv().await {
        let text = match msg {
            Message::Text(t) => t,
            Message::Close(_) => break,
            _ => continue,
        };

        let user_message = match decode_inbound(&mut socket, &text).await {
            Ok(Some(m)) => m,
            Ok(None) => continue,
            Err(()) => break,
        };

        let outbound = match &state.metrics {
            Some(pipeline) => match pipeline.answer(&user_message).await {
                Ok(summary) => json!({ "type": "metrics", "output": summary }),
                Err(e) => {
                    tracing::warn!(error = %e, "metrics request failed");
                    json!({ "error": e.to_string() })
                }
            },
            None => json!({ "error": "metrics is not available" }),
        };

        if send_json(&mut socket, &outbound).await.is_err() {
            break;
        }
    }

    tracing::info!("metrics client disconnected");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn inbound_missing_message_field_defaults_to_empty() {
        let inbound: Inbound = serde_json::from_str("{}").unwrap();
        assert!(inbound.message.is_empty());
    }

    #[test]
    fn inbound_extra_fields_are_ignored() {
        let inbound: Inbound =
            serde_json::from_str(r#"{"message": "hi", "model": "x"}"#).unwrap();
        assert_eq!(inbound.message, "hi");
    }

    #[test]
    fn turn_reply_serializes_with_context() {
        let mut context = Map::new();
        context.insert("dedup_key".into(), json!("uuid"));
        let wire = reply_to_wire(&TurnReply::Turn {
            message: "ok".into(),
            context,
        });
        assert_eq!(wire, json!({"message": "ok", "context": {"dedup_key": "uuid"}}));
    }

    #[test]
    fn delta_reply_serializes_with_delta() {
        let mut delta = Map::new();
        delta.insert("dedup_key".into(), json!("uuid"));
        let wire = reply_to_wire(&TurnReply::Delta {
            message: "ok".into(),
            delta,
        });
        assert_eq!(wire, json!({"message": "ok", "delta": {"dedup_key": "uuid"}}));
        assert!(wire.get("context").is_none());
    }

    #[test]
    fn timeout_errors_get_the_retryable_text() {
        assert_eq!(
            error_text(&Error::Timeout("model call exceeded 90000ms".into())),
            "Request to AI provider timed out."
        );
    }

    #[test]
    fn extraction_errors_keep_the_fixed_text() {
        assert_eq!(error_text(&Error::Extraction), "AI response could not be parsed.");
    }
}
