//! Unified error type for the data layer

use thiserror::Error;

/// Error type for store operations
///
/// Read-path cancellation and timeouts are distinct variants so callers can
/// map them to different HTTP statuses.
#[derive(Error, Debug)]
pub enum DataError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Query exceeded its deadline
    #[error("Query timeout after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Request-scoped cancellation (client disconnect)
    #[error("Operation cancelled")]
    Cancelled,

    /// Conflict error (duplicate entry, constraint violation)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Create a timeout error
    pub fn timeout(timeout_secs: u64) -> Self {
        Self::Timeout { timeout_secs }
    }

    /// Check if this error is likely transient and worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ) || e
                .as_database_error()
                .is_some_and(|d| d.message().contains("database is locked")),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error_display() {
        let err = DataError::timeout(15);
        assert_eq!(err.to_string(), "Query timeout after 15s");
    }

    #[test]
    fn test_is_transient() {
        assert!(DataError::timeout(15).is_transient());
        assert!(DataError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!DataError::Config("bad config".into()).is_transient());
        assert!(!DataError::Cancelled.is_transient());
        assert!(!DataError::Conflict("duplicate".into()).is_transient());
    }
}
