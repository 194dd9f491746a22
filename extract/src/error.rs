//! Error types for extraction.

use thiserror::Error;

/// Errors that abort extraction.
///
/// Selector fallbacks and missing containers are not errors; they surface as
/// [`ParseSignal`](crate::ParseSignal)s in the extraction report.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Captured HTML is absent, empty or contains no markup.
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// Module, menu or screen name is empty. Metadata is keyed on all three.
    #[error("screen identity is incomplete: {0}")]
    IncompleteContext(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization failure while persisting metadata.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
