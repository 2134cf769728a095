use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use medbridge::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Engine(err) => match err {
                EngineError::Unauthorized => StatusCode::UNAUTHORIZED,
                EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
                EngineError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::InvalidTransition { .. }
                | EngineError::AlreadyClaimed(_)
                | EngineError::NotApproved { .. } => StatusCode::CONFLICT,
                EngineError::Validation(_) => StatusCode::BAD_REQUEST,
                EngineError::StorageUnavailable(_)
                | EngineError::MappingsNotPersisted { .. }
                | EngineError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Engine(err) => err.code(),
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }

    fn retry_after_secs(&self) -> Option<i64> {
        match self {
            ServerError::Engine(EngineError::RateLimited { retry_at, .. }) => {
                Some((*retry_at - chrono::Utc::now()).num_seconds().max(1))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let retry_after = self.retry_after_secs();

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<std::net::AddrParseError> for ServerError {
    fn from(err: std::net::AddrParseError) -> Self {
        ServerError::Config(format!("Invalid address: {err}"))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("worker task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medbridge::DonationStatus;

    #[test]
    fn engine_errors_map_to_http_statuses() {
        let cases = [
            (EngineError::Unauthorized, StatusCode::UNAUTHORIZED),
            (EngineError::Forbidden("admin".into()), StatusCode::FORBIDDEN),
            (
                EngineError::RateLimited {
                    operation: "map-donation".into(),
                    retry_at: chrono::Utc::now(),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (EngineError::NotFound("donation 'x'".into()), StatusCode::NOT_FOUND),
            (EngineError::AlreadyClaimed("x".into()), StatusCode::CONFLICT),
            (
                EngineError::NotApproved {
                    donation_id: "x".into(),
                    status: DonationStatus::Pending,
                },
                StatusCode::CONFLICT,
            ),
            (
                EngineError::InvalidTransition {
                    from: DonationStatus::Claimed,
                    to: DonationStatus::Approved,
                },
                StatusCode::CONFLICT,
            ),
            (EngineError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                EngineError::StorageUnavailable("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status_code(), status);
        }
    }

    #[test]
    fn rate_limited_response_carries_retry_after() {
        let err = ServerError::from(EngineError::RateLimited {
            operation: "map-donation".into(),
            retry_at: chrono::Utc::now() + chrono::Duration::seconds(120),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(RETRY_AFTER));
    }
}
