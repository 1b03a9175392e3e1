//! API routes for irrigd

use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use irrig_shared::{Decision, FeatureVector, StatusView, VERSION};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

type AppStateArc = Arc<AppState>;

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (status, Json(json!({ "error": message.to_string() })))
}

// ============================================================================
// Decision Routes
// ============================================================================

pub fn decision_routes() -> Router<AppStateArc> {
    Router::new().route("/pump_and_predict", post(pump_and_predict))
}

async fn pump_and_predict(
    State(state): State<AppStateArc>,
    body: Bytes,
) -> Result<Json<Decision>, ApiError> {
    let features = parse_features(&body)?;

    let decision = state.coordinator.evaluate(features).await.map_err(|e| {
        error!("  Prediction failed: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
    })?;

    Ok(Json(decision))
}

/// An empty or `null` body counts as `{}`; absent fields become 0.
/// Anything other than a JSON object is rejected.
fn parse_features(body: &[u8]) -> Result<FeatureVector, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(FeatureVector::default());
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("invalid JSON body: {}", e)))?;

    match value {
        Value::Null => Ok(FeatureVector::default()),
        obj @ Value::Object(_) => serde_json::from_value(obj).map_err(|e| {
            api_error(StatusCode::BAD_REQUEST, format!("invalid feature values: {}", e))
        }),
        _ => Err(api_error(
            StatusCode::BAD_REQUEST,
            "request body must be a JSON object",
        )),
    }
}

// ============================================================================
// Status Routes
// ============================================================================

pub fn status_routes() -> Router<AppStateArc> {
    Router::new().route("/status", get(status))
}

async fn status(State(state): State<AppStateArc>) -> Json<StatusView> {
    Json(state.state.view().await)
}

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: VERSION,
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Metrics Routes
// ============================================================================

pub fn metrics_routes() -> Router<AppStateArc> {
    Router::new().route("/metrics", get(metrics))
}

async fn metrics(State(state): State<AppStateArc>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!("  Metrics encoding failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}
