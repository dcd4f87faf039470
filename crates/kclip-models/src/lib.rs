//! Shared data models for the kclip dataset downloader.
//!
//! This crate provides Serde-aware types for:
//! - Annotation catalogs (flat and hierarchical)
//! - Segment boundaries and timestamps
//! - Work-queue tasks
//! - Deterministic artifact paths
//! - Failure records

pub mod artifact;
pub mod catalog;
pub mod error;
pub mod failure;
pub mod segment;
pub mod task;
pub mod timestamp;
pub mod video;

// Re-export common types
pub use artifact::{
    action_clip_path, compressed_path, event_clip_path, event_clip_stem, fallback_download_path,
    flat_clip_path, raw_download_path, ACTION_VIDEOS_DIR, BOUNDARY_PAD_WIDTH, EVENT_VIDEOS_DIR,
    FALLBACK_CONTAINER,
};
pub use catalog::{class_dir_name, Catalog, CatalogEntry};
pub use error::{ModelError, ModelResult};
pub use failure::{FailureRecord, FailureStage};
pub use segment::{Event, Segment, Span, TimeRange};
pub use task::{ClipTask, EventTask, TaskKind};
pub use timestamp::{Timestamp, TimestampError};
pub use video::VideoId;
