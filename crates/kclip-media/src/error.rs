//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while running the external tools.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    #[error("Download failed: {message}")]
    DownloadFailed {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Compression failed: {message}")]
    CompressFailed {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a tool-not-found error.
    pub fn tool_not_found(program: impl Into<String>) -> Self {
        Self::ToolNotFound(program.into())
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
            exit_code,
        }
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(message: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a compression failure error.
    pub fn compress_failed(message: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::CompressFailed {
            message: message.into(),
            exit_code,
        }
    }

    /// Exit code of the external tool, if it ran and exited.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::DownloadFailed { exit_code, .. }
            | Self::FfmpegFailed { exit_code, .. }
            | Self::CompressFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_is_preserved() {
        assert_eq!(MediaError::ffmpeg_failed("boom", Some(1)).exit_code(), Some(1));
        assert_eq!(MediaError::download_failed("gone", None).exit_code(), None);
        assert_eq!(MediaError::tool_not_found("gzip").exit_code(), None);
        assert_eq!(MediaError::tool_not_found("gzip").to_string(), "gzip not found in PATH");
    }
}
