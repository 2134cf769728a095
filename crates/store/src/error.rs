use thiserror::Error;

/// Errors raised by a storage backend.
///
/// Every variant means the operation did not happen; callers must never
/// read a `StoreError` as an implicit success.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Record encode error: {0}")]
    Encode(String),
    #[error("Record decode error: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}
