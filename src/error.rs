// src/error.rs
// Standardized error types for faultstore

use thiserror::Error;

/// Main error type for the faultstore library
#[derive(Error, Debug)]
pub enum FaultError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backing store could not be reached or stayed contended past the
    /// retry budget. The fault was neither merged nor inserted; the caller
    /// decides whether to drop, retry, or log locally.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown error: {0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Convenience type alias for Result using FaultError
pub type Result<T> = std::result::Result<T, FaultError>;

impl From<String> for FaultError {
    fn from(s: String) -> Self {
        FaultError::Other(s)
    }
}

impl From<tokio::task::JoinError> for FaultError {
    fn from(err: tokio::task::JoinError) -> Self {
        FaultError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_error() {
        let err = FaultError::InvalidInput("no fault supplied".to_string());
        assert!(err.to_string().contains("invalid input"));
        assert!(err.to_string().contains("no fault supplied"));
    }

    #[test]
    fn test_store_unavailable_error() {
        let err = FaultError::StoreUnavailable("connection pool closed".to_string());
        assert!(err.to_string().contains("store unavailable"));
        assert!(err.to_string().contains("connection pool closed"));
    }

    #[test]
    fn test_config_error() {
        let err = FaultError::Config("bad window".to_string());
        assert!(err.to_string().contains("configuration error"));
    }

    #[test]
    fn test_from_string() {
        let err: FaultError = "some error".to_string().into();
        assert!(matches!(err, FaultError::Other(_)));
        assert!(err.to_string().contains("some error"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FaultError = io_err.into();
        assert!(matches!(err, FaultError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<i32>("not json").unwrap_err();
        let err: FaultError = json_err.into();
        assert!(matches!(err, FaultError::Json(_)));
    }

    #[test]
    fn test_debug_impl() {
        let err = FaultError::InvalidInput("debug test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("InvalidInput"));
    }
}
