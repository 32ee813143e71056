//! Error taxonomy for ODP Search.
//!
//! Only [`OdpError::Configuration`] is fatal, and only at startup.
//! Extraction errors are contained to one pattern, index unavailability to
//! one retrieval strategy, and query parse errors become empty results.

use odp_search_core::extract::ExtractionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OdpError>;

#[derive(Error, Debug)]
pub enum OdpError {
    /// One pattern document could not be extracted.
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// An index could not be opened (never built, or corrupt).
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// Required paths or properties missing or invalid at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The query string could not be turned into terms.
    #[error("Query parse error: {0}")]
    QueryParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OdpError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::IndexUnavailable(msg.into())
    }
}
