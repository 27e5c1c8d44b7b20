use thiserror::Error;

/// Unified error type for planner operations.
#[derive(Error, Debug)]
pub enum AufsichtError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Update error: {0}")]
    Update(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Convenience type alias for Results in the planner.
pub type Result<T> = std::result::Result<T, AufsichtError>;

impl AufsichtError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        AufsichtError::Config(msg.into())
    }

    /// Create a validation error with context
    pub fn validation(msg: impl Into<String>) -> Self {
        AufsichtError::Validation(msg.into())
    }

    /// Create an import error with context
    pub fn import(msg: impl Into<String>) -> Self {
        AufsichtError::Import(msg.into())
    }

    /// Create a not-found error with context
    pub fn not_found(msg: impl Into<String>) -> Self {
        AufsichtError::NotFound(msg.into())
    }

    /// Create an update error with context
    pub fn update(msg: impl Into<String>) -> Self {
        AufsichtError::Update(msg.into())
    }

    /// Create a store error with context
    pub fn store(msg: impl Into<String>) -> Self {
        AufsichtError::Store(msg.into())
    }
}
