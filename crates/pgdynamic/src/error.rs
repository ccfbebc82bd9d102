//! Error types for pgdynamic

use thiserror::Error;

/// Result type alias for pgdynamic operations
pub type PgdResult<T> = Result<T, PgdError>;

/// Error types for query building and execution
#[derive(Debug, Error)]
pub enum PgdError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error, passed through from the driver unchanged
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Malformed descriptor (missing connector, empty filter, bad page, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Row decode/materialization error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Connection descriptor could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// A mutation failed and the compensating rollback failed as well
    #[error("{source} (rollback failed: {rollback})")]
    Rollback {
        source: Box<PgdError>,
        rollback: Box<PgdError>,
    },
}

impl PgdError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a caller-input error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// The server-side error, if the driver reported one.
    ///
    /// For [`PgdError::Rollback`] this looks at the original failure.
    pub fn db_error(&self) -> Option<&tokio_postgres::error::DbError> {
        match self {
            Self::Query(err) => err.as_db_error(),
            Self::Rollback { source, .. } => source.db_error(),
            _ => None,
        }
    }

    /// The five-character SQLSTATE code, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        self.db_error().map(|e| e.code().code())
    }

    /// Check if this is a unique constraint violation (SQLSTATE 23505)
    pub fn is_unique_violation(&self) -> bool {
        self.sqlstate() == Some("23505")
    }

    /// Check if this is a foreign key violation (SQLSTATE 23503)
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sqlstate() == Some("23503")
    }
}
