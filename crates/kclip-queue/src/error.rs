//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue capacity must be at least 1")]
    ZeroCapacity,

    #[error("Queue closed: no consumer is left")]
    Closed,
}
