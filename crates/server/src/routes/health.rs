use crate::error::{ServerError, ServerResult};
use crate::routes::blocking;
use crate::state::ServerState;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// Health check endpoint (liveness)
/// Returns 200 if server is running
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "medbridge-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
    }))
}

/// Readiness check endpoint
/// Returns 200 once the store answers, 503 otherwise
pub async fn readiness_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let engine = state.engine.clone();
    let probe = blocking(move || {
        engine.store().get_donation("__readiness_probe__")?;
        Ok(())
    })
    .await;

    let (status, store_status) = match probe {
        Ok(()) => (StatusCode::OK, "ready".to_string()),
        Err(err) => {
            tracing::warn!(error = %err, "readiness probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
    };

    (
        status,
        Json(json!({
            "status": if status.is_success() { "ready" } else { "unavailable" },
            "service": "medbridge-server",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "uptime_seconds": state.uptime_seconds(),
            "components": {
                "api": "ready",
                "store": store_status,
            }
        })),
    )
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    if !state.config.metrics_enabled {
        return Err(ServerError::NotFound);
    }
    let body = state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();
    Ok(([(CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
