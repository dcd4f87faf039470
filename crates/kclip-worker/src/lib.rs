//! Dataset clip downloader.
//!
//! This crate provides:
//! - The per-video processing pipeline (fetch, trim, nested trims, compress)
//! - The task expander feeding the bounded work queue
//! - The worker pool and the failure sink
//! - The pool orchestrator and its ordered shutdown

pub mod config;
pub mod error;
pub mod expander;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod sink;
pub mod worker;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use expander::{ExpansionMode, FeedReport, TaskExpander};
pub use logging::VideoLogger;
pub use orchestrator::{Pool, PoolReport, PoolState};
pub use pipeline::{process_video, PipelineOptions, VideoPass};
pub use sink::{FailureSink, SinkReport};
pub use worker::{process_task, Worker, WorkerStats};
