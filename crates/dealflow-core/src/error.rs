use thiserror::Error;

/// Core error type for dealflow operations.
#[derive(Error, Debug)]
pub enum DealflowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid task transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Email error: {message}")]
    Email { message: String, retriable: bool },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DealflowError {
    /// Whether a retry of the failed operation may succeed.
    ///
    /// Only the email path distinguishes transient from permanent failures;
    /// everything else is surfaced once and never retried automatically.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Email { retriable: true, .. })
    }
}

impl From<serde_json::Error> for DealflowError {
    fn from(e: serde_json::Error) -> Self {
        DealflowError::Serialization(e.to_string())
    }
}

/// Result type alias using DealflowError.
pub type Result<T> = std::result::Result<T, DealflowError>;
