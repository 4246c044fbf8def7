//! Error types for sqlgom

use thiserror::Error;

/// Result type alias for sqlgom operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Boxed error produced by an execution backend.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Builder or handle misconfiguration (no table, no transaction, bad config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure reported by the execution backend or its cursor
    #[error(transparent)]
    Backend(BackendError),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A scalar read whose column could not be coerced into the requested type
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A query hook refused to run the statement
    #[error("Query aborted: {0}")]
    Aborted(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Wrap a backend error without altering it
    pub fn backend(err: impl Into<BackendError>) -> Self {
        Self::Backend(err.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for OrmError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => Self::not_found("query returned no rows"),
            other => Self::Backend(Box::new(other)),
        }
    }
}

impl From<toml::de::Error> for OrmError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
