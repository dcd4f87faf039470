//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid segment key '{0}', expected <tag>_<start>_<end>")]
    InvalidSegmentKey(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModelError {
    pub fn invalid_segment_key(key: impl Into<String>) -> Self {
        Self::InvalidSegmentKey(key.into())
    }
}
