//! Pattern extraction seam.
//!
//! A [`PatternExtractor`] turns the raw bytes of one pattern document into
//! an [`ExtractedPattern`]. Failures are per-document: the index builder
//! logs them and moves on.

use thiserror::Error;

use crate::models::ExtractedPattern;

/// Why one pattern document could not be extracted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("{source_name}: document could not be parsed: {reason}")]
    Malformed { source_name: String, reason: String },

    #[error("{source_name}: no pattern identifier found")]
    MissingId { source_name: String },

    #[error("{source_name}: extraction timed out after {secs}s")]
    TimedOut { source_name: String, secs: u64 },
}

impl ExtractionError {
    pub fn malformed(source_name: &str, reason: impl ToString) -> Self {
        Self::Malformed {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn missing_id(source_name: &str) -> Self {
        Self::MissingId {
            source_name: source_name.to_string(),
        }
    }
}

/// Extracts pattern metadata from one ontology document.
///
/// `source_name` identifies the document in errors and logs (usually its
/// relative path); it is never used as the pattern id.
pub trait PatternExtractor: Send + Sync {
    fn extract(&self, source_name: &str, content: &[u8]) -> Result<ExtractedPattern, ExtractionError>;
}
