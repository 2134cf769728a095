//! API route handlers
//!
//! Routes are organized by functionality:
//!
//! - `health`: Health checks, readiness, and metrics
//! - `donations`: Donor intake and administrator review
//! - `matching`: The matching trigger and stored mappings
//! - `claims`: Exclusive claims on approved donations
//! - `recipients`: The caller's recipient profile and requirements

pub mod claims;
pub mod donations;
pub mod health;
pub mod matching;
pub mod recipients;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use medbridge::EngineError;
use serde_json::json;

/// API version and base info
///
/// Returns server information including version and available endpoints.
/// This is the root endpoint (GET /) and requires no authentication.
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "MedBridge Server",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/api/v1/donations",
            "/api/v1/map-donation",
            "/api/v1/donations/{id}/approve",
            "/api/v1/donations/{id}/claim",
            "/api/v1/recipients/me",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
///
/// Returns a standardized error response for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}

/// Run a synchronous engine call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> ServerResult<T>
where
    F: FnOnce() -> Result<T, EngineError> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}
