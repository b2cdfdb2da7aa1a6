//! Failure taxonomy for delineation requests.

use serde::Serialize;
use terrain_grid::GridError;
use thiserror::Error;

/// Errors a delineation request can end with.
///
/// `Clone` so a failed single-flight computation can be handed to every
/// caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DelineationError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Terrain data unavailable: {0}")]
    MissingData(String),

    #[error("Location outside data coverage: {0}")]
    OutOfCoverage(String),

    #[error("Watershed too large: {0}")]
    ResultTooLarge(String),

    #[error("Empty watershed: {0}")]
    EmptyResult(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serializable name of a failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidParameter,
    MissingData,
    OutOfCoverage,
    ResultTooLarge,
    EmptyResult,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidParameter => "invalid_parameter",
            ErrorKind::MissingData => "missing_data",
            ErrorKind::OutOfCoverage => "out_of_coverage",
            ErrorKind::ResultTooLarge => "result_too_large",
            ErrorKind::EmptyResult => "empty_result",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DelineationError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn missing_data(msg: impl Into<String>) -> Self {
        Self::MissingData(msg.into())
    }

    pub fn out_of_coverage(msg: impl Into<String>) -> Self {
        Self::OutOfCoverage(msg.into())
    }

    pub fn result_too_large(msg: impl Into<String>) -> Self {
        Self::ResultTooLarge(msg.into())
    }

    pub fn empty_result(msg: impl Into<String>) -> Self {
        Self::EmptyResult(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::MissingData(_) => ErrorKind::MissingData,
            Self::OutOfCoverage(_) => ErrorKind::OutOfCoverage,
            Self::ResultTooLarge(_) => ErrorKind::ResultTooLarge,
            Self::EmptyResult(_) => ErrorKind::EmptyResult,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Human-readable detail without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidParameter(msg)
            | Self::MissingData(msg)
            | Self::OutOfCoverage(msg)
            | Self::ResultTooLarge(msg)
            | Self::EmptyResult(msg)
            | Self::Internal(msg) => msg,
        }
    }
}

impl From<GridError> for DelineationError {
    fn from(err: GridError) -> Self {
        Self::MissingData(err.to_string())
    }
}

impl From<storage::StorageError> for DelineationError {
    fn from(err: storage::StorageError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for DelineationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("Result serialization failed: {}", err))
    }
}

impl From<tokio::task::JoinError> for DelineationError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Worker task failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, DelineationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(
            DelineationError::out_of_coverage("x").kind().as_str(),
            "out_of_coverage"
        );
        assert_eq!(
            serde_json::to_string(&ErrorKind::ResultTooLarge).unwrap(),
            "\"result_too_large\""
        );
    }

    #[test]
    fn test_grid_error_becomes_missing_data() {
        let err: DelineationError = GridError::NotFound("dem".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::MissingData);
        assert!(err.detail().contains("dem"));
    }
}
