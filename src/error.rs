use chrono::{DateTime, Utc};
use matcher::MatchError;
use store::{DonationStatus, StoreError};
use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// Authorization and validation failures are final. `RateLimited` only
/// concerns the matching trigger; it never undoes an approval.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("authentication required")]
    Unauthorized,

    #[error("caller lacks the {0} capability")]
    Forbidden(String),

    #[error("rate limit exceeded for '{operation}', retry after {retry_at}")]
    RateLimited {
        operation: String,
        retry_at: DateTime<Utc>,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("cannot move donation from {from} to {to}")]
    InvalidTransition {
        from: DonationStatus,
        to: DonationStatus,
    },

    #[error("donation {0} was already claimed")]
    AlreadyClaimed(String),

    #[error("donation {donation_id} is {status}, not approved")]
    NotApproved {
        donation_id: String,
        status: DonationStatus,
    },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{computed} matches computed but not persisted: {reason}")]
    MappingsNotPersisted { computed: usize, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn not_found(kind: &str, id: &str) -> Self {
        EngineError::NotFound(format!("{kind} '{id}'"))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Unauthorized => "UNAUTHORIZED",
            EngineError::Forbidden(_) => "FORBIDDEN",
            EngineError::RateLimited { .. } => "RATE_LIMITED",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::InvalidTransition { .. } => "INVALID_TRANSITION",
            EngineError::AlreadyClaimed(_) => "ALREADY_CLAIMED",
            EngineError::NotApproved { .. } => "NOT_APPROVED",
            EngineError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::MappingsNotPersisted { .. } => "MAPPINGS_NOT_PERSISTED",
            EngineError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::StorageUnavailable(err.to_string())
    }
}

impl From<MatchError> for EngineError {
    fn from(err: MatchError) -> Self {
        EngineError::Config(err.to_string())
    }
}
