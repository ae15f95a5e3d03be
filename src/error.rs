//! Error types for the tariffsense classification system
//!
//! This module provides structured error handling using thiserror for
//! error definitions and anyhow for error propagation at the boundary.

use thiserror::Error;

/// Main error type for tariffsense operations
#[derive(Error, Debug)]
pub enum TariffsenseError {
    /// Caller passed malformed input (empty description, blank code)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Feedback store operation failed
    #[error("Feedback store error: {0}")]
    Store(String),

    /// Similarity index operation failed
    #[error("Similarity index error: {0}")]
    Index(String),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Primary classifier request failed
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Reference catalog lookup failed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Authentication with a remote collaborator failed
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Remote collaborator rate limit hit
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Network-level failure reaching a remote collaborator
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl TariffsenseError {
    /// Whether this error marks an unreachable collaborator rather than bad
    /// input. Collaborator failures are handled by degraded paths and never
    /// escape `classify`.
    pub fn is_collaborator_unavailable(&self) -> bool {
        matches!(
            self,
            TariffsenseError::Store(_)
                | TariffsenseError::Index(_)
                | TariffsenseError::Embedding(_)
                | TariffsenseError::Classifier(_)
                | TariffsenseError::Catalog(_)
                | TariffsenseError::RateLimit(_)
                | TariffsenseError::Network(_)
        )
    }
}

/// Result type alias for tariffsense operations
pub type Result<T> = std::result::Result<T, TariffsenseError>;

/// Convert anyhow::Error to TariffsenseError
impl From<anyhow::Error> for TariffsenseError {
    fn from(err: anyhow::Error) -> Self {
        TariffsenseError::Other(err.to_string())
    }
}
