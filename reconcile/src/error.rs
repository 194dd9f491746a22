//! Error types for reconciliation runs.
//!
//! Only conditions that make the whole run meaningless are errors. A missing
//! generated file, an ambiguous capture or an anchor that cannot be found is
//! recorded in the [`ReconciliationReport`](crate::ReconciliationReport)
//! instead.

use formsync_extract::ExtractError;
use thiserror::Error;

/// Errors that abort a reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A required input (configuration, capture, metadata, generation log)
    /// is absent.
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Configuration loaded but is unusable (unknown template placeholder,
    /// empty screen name, zero column limit).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metadata loaded from disk violates the metadata invariants.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Extraction failed for a reason other than a missing capture.
    #[error("extraction failed: {0}")]
    Extract(ExtractError),
}

impl From<ExtractError> for ReconcileError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::SourceNotFound(reason) => Self::SourceNotFound(reason),
            ExtractError::IoError(err) => Self::IoError(err),
            other => Self::Extract(other),
        }
    }
}

/// Convenience alias for results with [`ReconcileError`].
pub type Result<T> = std::result::Result<T, ReconcileError>;
