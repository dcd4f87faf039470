//! Bounded in-process queues.
//!
//! This crate provides:
//! - A capacity-limited channel shared by many consumers
//! - Explicit shutdown sentinels travelling in-band with the work
//! - The work queue (tasks) and failure queue (failure records) types

pub mod channel;
pub mod error;

pub use channel::{
    bounded, failure_queue, work_queue, FailureReceiver, FailureSender, QueueMessage,
    QueueReceiver, QueueSender, WorkReceiver, WorkSender,
};
pub use error::{QueueError, QueueResult};
