//! Worker error types.

use std::path::PathBuf;
use thiserror::Error;

use kclip_media::MediaError;
use kclip_models::{FailureRecord, FailureStage, ModelError, VideoId};
use kclip_queue::QueueError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Fetch failed for {video_id}: {source}")]
    FetchFailed {
        video_id: VideoId,
        #[source]
        source: MediaError,
    },

    #[error("Trim failed for {}: {source}", artifact.display())]
    TrimFailed {
        artifact: PathBuf,
        #[source]
        source: MediaError,
    },

    #[error("Compression failed for {}: {source}", artifact.display())]
    CompressFailed {
        artifact: PathBuf,
        #[source]
        source: MediaError,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Pool is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Catalog error: {0}")]
    Catalog(#[from] ModelError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn fetch_failed(video_id: &VideoId, source: MediaError) -> Self {
        Self::FetchFailed {
            video_id: video_id.clone(),
            source,
        }
    }

    pub fn trim_failed(artifact: impl Into<PathBuf>, source: MediaError) -> Self {
        Self::TrimFailed {
            artifact: artifact.into(),
            source,
        }
    }

    pub fn compress_failed(artifact: impl Into<PathBuf>, source: MediaError) -> Self {
        Self::CompressFailed {
            artifact: artifact.into(),
            source,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Stage a failed task is attributed to.
    pub fn stage(&self) -> FailureStage {
        match self {
            Self::FetchFailed { .. } => FailureStage::Fetch,
            Self::TrimFailed { .. } => FailureStage::Trim,
            Self::CompressFailed { .. } => FailureStage::Compress,
            _ => FailureStage::Io,
        }
    }

    /// Exit code of the failing external tool, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::FetchFailed { source, .. }
            | Self::TrimFailed { source, .. }
            | Self::CompressFailed { source, .. } => source.exit_code(),
            _ => None,
        }
    }

    /// Convert into the record handed to the failure sink.
    pub fn to_failure_record(&self, video_id: &VideoId) -> FailureRecord {
        FailureRecord::new(video_id.clone(), self.stage(), self.to_string())
            .with_exit_code(self.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_record_carries_stage_and_code() {
        let err = WorkerError::trim_failed(
            "/out/vid1.mp4",
            MediaError::ffmpeg_failed("FFmpeg exited with non-zero status", Some(1)),
        );
        let record = err.to_failure_record(&VideoId::from("vid1"));
        assert_eq!(record.stage, FailureStage::Trim);
        assert_eq!(record.exit_code, Some(1));
        assert!(record.message.contains("/out/vid1.mp4"));
        assert_eq!(record.log_line(), "vid1\n");
    }

    #[test]
    fn test_local_errors_are_io_stage() {
        let err = WorkerError::from(std::io::Error::other("disk full"));
        assert_eq!(err.stage(), FailureStage::Io);
        assert_eq!(err.exit_code(), None);
    }
}
