//! Structured per-video logging.
//!
//! Every line carries the video id and the worker that handles it, so the
//! interleaved output of many workers can be filtered per video.

use tracing::{debug, error, info, warn, Span};

use kclip_models::VideoId;

/// Logger for one video on one worker.
#[derive(Debug, Clone)]
pub struct VideoLogger {
    video_id: String,
    worker_id: usize,
}

impl VideoLogger {
    pub fn new(video_id: &VideoId, worker_id: usize) -> Self {
        Self {
            video_id: video_id.to_string(),
            worker_id,
        }
    }

    pub fn log_start(&self, passes: usize) {
        info!(
            video_id = %self.video_id,
            worker_id = self.worker_id,
            passes,
            "Video started"
        );
    }

    /// A stage is about to run.
    pub fn log_stage(&self, stage: &str, target: &str) {
        debug!(
            video_id = %self.video_id,
            worker_id = self.worker_id,
            stage,
            target,
            "Running stage"
        );
    }

    /// An artifact was already present.
    pub fn log_skip(&self, artifact: &str) {
        debug!(
            video_id = %self.video_id,
            worker_id = self.worker_id,
            artifact,
            "Artifact exists, skipping"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            video_id = %self.video_id,
            worker_id = self.worker_id,
            "Video warning: {}", message
        );
    }

    pub fn log_error(&self, stage: &str, exit_code: Option<i32>, message: &str) {
        error!(
            video_id = %self.video_id,
            worker_id = self.worker_id,
            stage,
            exit_code = ?exit_code,
            "Video failed: {}", message
        );
    }

    pub fn log_completion(&self) {
        info!(
            video_id = %self.video_id,
            worker_id = self.worker_id,
            "Video completed"
        );
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Span wrapping all work on this video.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "video",
            video_id = %self.video_id,
            worker_id = self.worker_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_logger_creation() {
        let logger = VideoLogger::new(&VideoId::from("abc123"), 3);
        assert_eq!(logger.video_id(), "abc123");
        assert_eq!(logger.worker_id(), 3);
    }
}
