//! Error types for the taxonomy engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaxonomyError>;

#[derive(Error, Debug)]
pub enum TaxonomyError {
    /// Tag store operation failed
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Curriculum rejected before any write
    #[error("Invalid curriculum: {0}")]
    InvalidCurriculum(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
