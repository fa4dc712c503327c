//! Error types for athena-lens.
//!
//! Defines the main error enum used throughout the query pipeline.

use thiserror::Error;

/// Main error type for athena-lens operations.
#[derive(Error, Debug)]
pub enum LensError {
    /// The statement did not pass the read-only gate. Never retried.
    #[error("Query rejected: {0}")]
    ValidationRejected(String),

    /// The engine refused to start the query (bad credentials, unknown database, quota).
    #[error("Submission error: {0}")]
    Submission(String),

    /// The remote query ran and failed.
    #[error("Query {query_id} failed: {reason} (while running `{sql}` on {database})")]
    ExecutionFailed {
        query_id: String,
        reason: String,
        sql: String,
        database: String,
    },

    /// The remote query was cancelled on the engine side.
    #[error("Query {query_id} was cancelled: {reason} (while running `{sql}` on {database})")]
    ExecutionCancelled {
        query_id: String,
        reason: String,
        sql: String,
        database: String,
    },

    /// The local wait gave up. The remote query may still be running.
    #[error(
        "Query {query_id} timed out after {elapsed_secs}s (while running `{sql}` on {database}); \
         try a smaller query"
    )]
    ExecutionTimedOut {
        query_id: String,
        elapsed_secs: u64,
        sql: String,
        database: String,
    },

    /// Results were requested for a query that did not succeed. A call-site bug.
    #[error("Materialization error: {0}")]
    Materialization(String),

    /// A status or result request to the engine failed.
    #[error("Engine error: {0}")]
    Engine(String),

    /// The caller stopped waiting.
    #[error("Aborted: {0}")]
    Aborted(String),

    /// Configuration errors (invalid config file, bad output location, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LensError {
    /// Creates a validation rejection with the given reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::ValidationRejected(reason.into())
    }

    /// Creates a submission error with the given message.
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    /// Creates a materialization error with the given message.
    pub fn materialization(msg: impl Into<String>) -> Self {
        Self::Materialization(msg.into())
    }

    /// Creates an engine error with the given message.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Creates an aborted error with the given message.
    pub fn aborted(msg: impl Into<String>) -> Self {
        Self::Aborted(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::ValidationRejected(_) => "Validation Error",
            Self::Submission(_) => "Submission Error",
            Self::ExecutionFailed { .. } => "Execution Failed",
            Self::ExecutionCancelled { .. } => "Execution Cancelled",
            Self::ExecutionTimedOut { .. } => "Execution Timed Out",
            Self::Materialization(_) => "Materialization Error",
            Self::Engine(_) => "Engine Error",
            Self::Aborted(_) => "Aborted",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true when the caller may reasonably resubmit a narrower query.
    pub fn is_retryable_by_caller(&self) -> bool {
        matches!(self, Self::ExecutionTimedOut { .. })
    }

    /// Returns true for errors that indicate a bug at the call site.
    pub fn is_programming_error(&self) -> bool {
        matches!(self, Self::Materialization(_) | Self::Internal(_))
    }

    /// Process exit code for the binary: 2 for bugs, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        if self.is_programming_error() {
            2
        } else {
            1
        }
    }
}

/// Result type alias using LensError.
pub type Result<T> = std::result::Result<T, LensError>;
