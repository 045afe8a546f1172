//! Storage error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("deck name already in use: {0}")]
    DeckNameTaken(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
