// src/error.rs
use thiserror::Error;

/// Errors returned across the store boundary. Validation failures are
/// values, not panics, and a failed operation leaves the store's
/// in-memory state untouched (save failures excepted, see the store
/// docs).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("username already exists")]
    DuplicateUsername,
    #[error("old password is incorrect")]
    WrongPassword,
    #[error("saved CPN must be exactly 8 characters")]
    InvalidCpn,
    #[error("no device with id {0}")]
    NotFound(u32),
    #[error("incorrect secret, access denied")]
    AccessDenied,
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
