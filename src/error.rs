//! Error types for the brickyard service
//!
//! Provides structured error types for all service components including
//! the metadata store, backend selection, allocation, and the REST API.

use thiserror::Error;

/// Unified error type for the service
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Startup Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown executor kind: {kind}")]
    UnknownExecutor { kind: String },

    #[error("Unknown allocator kind: {kind}")]
    UnknownAllocator { kind: String },

    // =========================================================================
    // Store Errors
    // =========================================================================
    #[error("Unable to open store {path}: {reason}")]
    StoreOpen { path: String, reason: String },

    #[error("Store operation failed: {0}")]
    StoreOp(String),

    // =========================================================================
    // Backend Errors
    // =========================================================================
    #[error("Command execution failed on {host}: {reason}")]
    ExecutionFailed { host: String, reason: String },

    #[error("Allocation failed: {0}")]
    AllocationFailed(String),

    #[error("Insufficient capacity: requested {requested_kb} KB, available {available_kb} KB")]
    InsufficientCapacity { requested_kb: u64, available_kb: u64 },

    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Request validation failed: {0}")]
    Validation(String),

    // =========================================================================
    // Parse / IO Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short machine-readable slug used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::UnknownExecutor { .. } => "unknown_executor",
            Error::UnknownAllocator { .. } => "unknown_allocator",
            Error::StoreOpen { .. } => "store_open",
            Error::StoreOp(_) => "store_error",
            Error::ExecutionFailed { .. } => "execution_failed",
            Error::AllocationFailed(_) => "allocation_failed",
            Error::InsufficientCapacity { .. } => "insufficient_capacity",
            Error::NotFound { .. } => "not_found",
            Error::Validation(_) => "validation",
            Error::JsonParse(_) => "json_parse",
            Error::Io(_) => "io",
            Error::Internal(_) => "internal",
        }
    }

    /// Check whether this error must abort service construction.
    ///
    /// Startup-fatal errors never downgrade to a degraded-but-running mode.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_)
                | Error::UnknownExecutor { .. }
                | Error::UnknownAllocator { .. }
                | Error::StoreOpen { .. }
        )
    }
}

impl From<redb::TransactionError> for Error {
    fn from(e: redb::TransactionError) -> Self {
        Error::StoreOp(e.to_string())
    }
}

impl From<redb::TableError> for Error {
    fn from(e: redb::TableError) -> Self {
        Error::StoreOp(e.to_string())
    }
}

impl From<redb::StorageError> for Error {
    fn from(e: redb::StorageError) -> Self {
        Error::StoreOp(e.to_string())
    }
}

impl From<redb::CommitError> for Error {
    fn from(e: redb::CommitError) -> Self {
        Error::StoreOp(e.to_string())
    }
}

/// Result type alias for the service
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = Error::UnknownExecutor { kind: "rsh".into() };
        assert_eq!(err.kind(), "unknown_executor");

        let err = Error::NotFound {
            kind: "volume",
            id: "abc123".into(),
        };
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_startup_fatal() {
        assert!(Error::Configuration("bad config".into()).is_startup_fatal());
        assert!(Error::UnknownAllocator { kind: "x".into() }.is_startup_fatal());

        let request_err = Error::NotFound {
            kind: "cluster",
            id: "00ff".into(),
        };
        assert!(!request_err.is_startup_fatal());
    }
}
