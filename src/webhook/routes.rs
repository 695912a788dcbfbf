//! HTTP endpoints: webhook verification, event delivery and health.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::channels::whatsapp_types::WebhookEnvelope;
use crate::webhook::dispatcher::Dispatcher;

/// Shared state for webhook routes.
#[derive(Clone)]
pub struct WebhookState {
    pub dispatcher: Arc<Dispatcher>,
    pub verify_token: Arc<str>,
    /// How long POST waits for processing before acknowledging anyway.
    pub ack_budget: Duration,
}

/// Subscription handshake parameters. The provider sends `hub.*` names;
/// bare names are accepted too.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode", alias = "mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token", alias = "verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge", alias = "challenge")]
    challenge: Option<String>,
}

/// GET /webhook
///
/// Echoes the challenge when the mode is `subscribe` and the token matches.
async fn verify(
    State(state): State<WebhookState>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    let (Some(mode), Some(token), Some(challenge)) =
        (params.mode, params.verify_token, params.challenge)
    else {
        return (StatusCode::BAD_REQUEST, String::new());
    };

    if mode == "subscribe" && token == *state.verify_token {
        tracing::info!("Webhook verified");
        (StatusCode::OK, challenge)
    } else {
        tracing::warn!(mode, "Webhook verification rejected");
        (StatusCode::FORBIDDEN, String::new())
    }
}

/// POST /webhook
///
/// Always answers 200. Processing runs on its own task; if it outlives the
/// ack budget it carries on after the response is sent.
async fn receive(State(state): State<WebhookState>, body: Bytes) -> StatusCode {
    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable webhook body");
            return StatusCode::OK;
        }
    };

    let dispatcher = Arc::clone(&state.dispatcher);
    let task = tokio::spawn(async move { dispatcher.handle_envelope(envelope).await });

    match tokio::time::timeout(state.ack_budget, task).await {
        Ok(Ok(outcomes)) => tracing::debug!(?outcomes, "Webhook processed"),
        Ok(Err(e)) => tracing::error!(error = %e, "Webhook task panicked"),
        Err(_) => tracing::info!(
            budget_ms = state.ack_budget.as_millis() as u64,
            "Ack budget exceeded; processing continues in background"
        ),
    }
    StatusCode::OK
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "ridebot"}))
}

/// Build the webhook router.
pub fn webhook_routes(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", get(verify).post(receive))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
