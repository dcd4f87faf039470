//! Failure records delivered to the failure sink.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::video::VideoId;

/// Pipeline stage that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Trim,
    Compress,
    /// Local filesystem work around the external tools.
    Io,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Fetch => "fetch",
            FailureStage::Trim => "trim",
            FailureStage::Compress => "compress",
            FailureStage::Io => "io",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A video whose task ended unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub video_id: VideoId,
    pub stage: FailureStage,
    /// Exit code of the failing external tool, when it ran to completion.
    pub exit_code: Option<i32>,
    pub message: String,
}

impl FailureRecord {
    pub fn new(video_id: VideoId, stage: FailureStage, message: impl Into<String>) -> Self {
        Self {
            video_id,
            stage,
            exit_code: None,
            message: message.into(),
        }
    }

    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// The line appended to the failure log.
    pub fn log_line(&self) -> String {
        format!("{}\n", self.video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_is_only_the_id() {
        let record = FailureRecord::new("vid1".into(), FailureStage::Trim, "ffmpeg exited with 1")
            .with_exit_code(Some(1));
        assert_eq!(record.log_line(), "vid1\n");
        assert_eq!(record.stage.to_string(), "trim");
    }
}
