//! Common error types for session log ingestion

use thiserror::Error;

/// Common result type for session log operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the session log crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Upload does not follow the session log wire format
    ///
    /// Raised before anything is persisted.
    #[error("Format error: {0}")]
    Format(String),

    /// More than one aggregate claims the same (owner, kind, value) key
    #[error("Aggregate ambiguity: {count} aggregates for owner '{owner}', {kind} = '{value}'")]
    AggregateAmbiguity {
        owner: String,
        kind: String,
        value: String,
        count: usize,
    },

    /// Optimistic update lost every retry
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the error is SQLite reporting lock contention
    pub fn is_database_locked(&self) -> bool {
        match self {
            Error::Database(db_err) => db_err.to_string().contains("database is locked"),
            _ => false,
        }
    }

    /// True when the error is a UNIQUE constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}
