// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the key generation service.

use std::fmt;

use axum::http::StatusCode;

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Service error types.
#[derive(Debug)]
pub enum Error {
    /// Configuration error
    Config(String),
    /// Backend error (construction, lookup or health)
    Backend(BackendError),
    /// Validation error
    Validation(ValidationError),
    /// A protocol run failed while executing its batch
    Execution(ExecutionError),
    /// Server error
    Server(String),
    /// IO error
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
}

impl Error {
    /// HTTP status used when this error crosses the service boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Backend(BackendError::NotFound(_)) => StatusCode::NOT_FOUND,
            Error::Backend(BackendError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Backend(BackendError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Error::Execution(e) if matches!(e.source, BackendError::Timeout(_)) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            Error::Execution(e) if matches!(e.source, BackendError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::Backend(BackendError::NotFound(_)) => "BACKEND_NOT_FOUND",
            Error::Backend(BackendError::Unavailable(_)) => "BACKEND_UNAVAILABLE",
            Error::Backend(_) => "BACKEND_ERROR",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Execution(_) => "EXECUTION_ERROR",
            Error::Server(_) => "SERVER_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Backend(e) => write!(f, "Backend error: {}", e),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Execution(e) => write!(f, "Execution error: {}", e),
            Error::Server(msg) => write!(f, "Server error: {}", msg),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Backend(e) => Some(e),
            Error::Validation(e) => Some(e),
            Error::Execution(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<BackendError> for Error {
    fn from(e: BackendError) -> Self {
        Error::Backend(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<ExecutionError> for Error {
    fn from(e: ExecutionError) -> Self {
        Error::Execution(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Backend-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend not found
    NotFound(String),
    /// Backend could not be constructed or reached
    Unavailable(String),
    /// Execution failed
    ExecutionFailed(String),
    /// Timeout
    Timeout(String),
    /// Invalid request
    InvalidRequest(String),
    /// A task produced an outcome that is not a single classical bit
    MalformedOutcome { task: usize, message: String },
    /// Fewer (or more) results than submitted tasks
    MissingOutcome { expected: usize, received: usize },
}

impl BackendError {
    /// Index of the task that triggered the failure, if the error names one.
    pub fn task_index(&self) -> Option<usize> {
        match self {
            BackendError::MalformedOutcome { task, .. } => Some(*task),
            BackendError::MissingOutcome { expected, received } if received < expected => {
                Some(*received)
            }
            _ => None,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::NotFound(name) => write!(f, "Backend not found: {}", name),
            BackendError::Unavailable(msg) => write!(f, "Backend unavailable: {}", msg),
            BackendError::ExecutionFailed(msg) => write!(f, "Execution failed: {}", msg),
            BackendError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            BackendError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            BackendError::MalformedOutcome { task, message } => {
                write!(f, "Malformed outcome for task {}: {}", task, message)
            }
            BackendError::MissingOutcome { expected, received } => write!(
                f,
                "Outcome count mismatch: expected {}, received {}",
                expected, received
            ),
        }
    }
}

impl std::error::Error for BackendError {}

/// Failure of a protocol run's batch execution.
///
/// Carries the index of the task that triggered the failure when it is known,
/// so callers can tell a whole-batch fault from a single bad outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    /// Index of the offending task
    pub task_index: Option<usize>,
    /// Underlying backend error
    pub source: BackendError,
}

impl ExecutionError {
    /// Wrap a backend error, taking the task index from it when present.
    pub fn new(source: BackendError) -> Self {
        Self {
            task_index: source.task_index(),
            source,
        }
    }
}

impl From<BackendError> for ExecutionError {
    fn from(e: BackendError) -> Self {
        ExecutionError::new(e)
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.task_index {
            Some(i) => write!(f, "task {}: {}", i, self.source),
            None => write!(f, "{}", self.source),
        }
    }
}

impl std::error::Error for ExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field validation failed
    Field { field: String, message: String },
    /// Resource limit exceeded
    ResourceLimit {
        resource: String,
        limit: u64,
        requested: u64,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Field { field, message } => {
                write!(f, "Field '{}': {}", field, message)
            }
            ValidationError::ResourceLimit {
                resource,
                limit,
                requested,
            } => {
                write!(
                    f,
                    "Resource limit exceeded for {}: limit={}, requested={}",
                    resource, limit, requested
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    // =========================================================================
    // Display
    // =========================================================================

    #[test]
    fn test_error_display_config() {
        let e = Error::Config("bad port".into());
        assert_eq!(e.to_string(), "Configuration error: bad port");
    }

    #[test]
    fn test_error_display_backend() {
        let e = Error::Backend(BackendError::NotFound("local_simulator".into()));
        assert_eq!(
            e.to_string(),
            "Backend error: Backend not found: local_simulator"
        );
    }

    #[test]
    fn test_error_display_validation() {
        let e = Error::Validation(ValidationError::Field {
            field: "key_length".into(),
            message: "must be greater than 0".into(),
        });
        assert_eq!(
            e.to_string(),
            "Validation error: Field 'key_length': must be greater than 0"
        );
    }

    #[test]
    fn test_error_display_execution_with_task() {
        let e = Error::Execution(ExecutionError::new(BackendError::MalformedOutcome {
            task: 7,
            message: "two outcomes".into(),
        }));
        assert_eq!(
            e.to_string(),
            "Execution error: task 7: Malformed outcome for task 7: two outcomes"
        );
    }

    #[test]
    fn test_error_display_execution_without_task() {
        let e = Error::Execution(ExecutionError::new(BackendError::Timeout("30s".into())));
        assert_eq!(e.to_string(), "Execution error: Timeout: 30s");
    }

    #[test]
    fn test_backend_error_display_missing_outcome() {
        let e = BackendError::MissingOutcome {
            expected: 4,
            received: 3,
        };
        assert_eq!(
            e.to_string(),
            "Outcome count mismatch: expected 4, received 3"
        );
    }

    #[test]
    fn test_validation_error_display_resource_limit() {
        let e = ValidationError::ResourceLimit {
            resource: "key_length".into(),
            limit: 4096,
            requested: 5000,
        };
        assert_eq!(
            e.to_string(),
            "Resource limit exceeded for key_length: limit=4096, requested=5000"
        );
    }

    // =========================================================================
    // Task index aggregation
    // =========================================================================

    #[test]
    fn test_task_index_from_malformed_outcome() {
        let e = ExecutionError::new(BackendError::MalformedOutcome {
            task: 3,
            message: "x".into(),
        });
        assert_eq!(e.task_index, Some(3));
    }

    #[test]
    fn test_task_index_from_missing_outcome_points_at_first_gap() {
        let e = ExecutionError::from(BackendError::MissingOutcome {
            expected: 10,
            received: 6,
        });
        assert_eq!(e.task_index, Some(6));
    }

    #[test]
    fn test_task_index_absent_for_whole_batch_failure() {
        let e = ExecutionError::new(BackendError::ExecutionFailed("boom".into()));
        assert_eq!(e.task_index, None);
    }

    // =========================================================================
    // Status mapping
    // =========================================================================

    #[test]
    fn test_status_code_mapping() {
        let validation: Error = ValidationError::Field {
            field: "length".into(),
            message: "bad".into(),
        }
        .into();
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.code(), "VALIDATION_ERROR");

        let not_found: Error = BackendError::NotFound("x".into()).into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let unavailable: Error = BackendError::Unavailable("x".into()).into();
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let timeout: Error = ExecutionError::new(BackendError::Timeout("x".into())).into();
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let failed: Error =
            ExecutionError::new(BackendError::ExecutionFailed("x".into())).into();
        assert_eq!(failed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.code(), "EXECUTION_ERROR");
    }

    // =========================================================================
    // source() and From impls
    // =========================================================================

    #[test]
    fn test_error_source() {
        assert!(Error::Io(std::io::Error::other("disk")).source().is_some());
        assert!(Error::Execution(ExecutionError::new(BackendError::Timeout("t".into())))
            .source()
            .is_some());
        assert!(Error::Config("x".into()).source().is_none());
        assert!(Error::Server("x".into()).source().is_none());
    }

    #[test]
    fn test_from_serde_errors() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("{{{{").unwrap_err();
        assert!(matches!(Error::from(yaml_err), Error::Serialization(_)));

        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        assert!(matches!(Error::from(json_err), Error::Serialization(_)));
    }
}
