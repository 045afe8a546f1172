//! Error types for kioku-core.

use thiserror::Error;

/// Errors that abort an import. Structural problems are aggregated into a
/// single `Validation` value; nothing is persisted when one is returned.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("import validation failed: {}", .errors.join("; "))]
    Validation { errors: Vec<String> },
}

/// Malformed unit-selector string in a vocabulary loader.
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("invalid unit selector: {0}")]
    InvalidFormat(String),
}
