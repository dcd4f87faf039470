//! Video acquisition using yt-dlp.
//!
//! One attempt per call: no retries, no sleep intervals. The caller decides
//! what a failure means for its task.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use kclip_models::VideoId;

use crate::command::check_tool;
use crate::error::{MediaError, MediaResult};

/// Options for a single fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Downloader executable (`yt-dlp` or a compatible fork).
    pub program: String,
    /// Preferred container, e.g. `mp4`.
    pub format: String,
    /// Append the downloader's stderr here instead of discarding it.
    pub log_path: Option<PathBuf>,
}

impl FetchOptions {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            program: "yt-dlp".to_string(),
            format: format.into(),
            log_path: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_log_path(mut self, log_path: Option<PathBuf>) -> Self {
        self.log_path = log_path;
        self
    }
}

/// Quality selector: best video in the requested container plus best audio.
pub fn format_selector(format: &str) -> String {
    format!("bestvideo[ext={}]+bestaudio/best", format)
}

/// Build the downloader arguments for a video.
pub fn build_fetch_args(video_id: &VideoId, output_path: &Path, format: &str) -> Vec<String> {
    vec![
        video_id.watch_url(),
        "--quiet".to_string(),
        "-f".to_string(),
        format_selector(format),
        "--output".to_string(),
        output_path.to_string_lossy().to_string(),
        "--no-continue".to_string(),
    ]
}

/// Download a video by id.
///
/// The downloader may write `{stem}.mkv` instead of `output_path` when it
/// cannot merge into the requested container; callers must look for it.
pub async fn fetch_video(
    video_id: &VideoId,
    output_path: impl AsRef<Path>,
    options: &FetchOptions,
) -> MediaResult<()> {
    let output_path = output_path.as_ref();

    check_tool(&options.program)?;

    info!(
        video_id = %video_id,
        output = %output_path.display(),
        "Downloading video"
    );

    let stderr = match &options.log_path {
        Some(path) => Stdio::from(OpenOptions::new().create(true).append(true).open(path)?),
        None => Stdio::null(),
    };

    let args = build_fetch_args(video_id, output_path, &options.format);
    debug!("Running downloader: {} {}", options.program, args.join(" "));

    let status = Command::new(&options.program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(stderr)
        .status()
        .await?;

    if !status.success() {
        warn!(
            video_id = %video_id,
            exit_code = ?status.code(),
            "Downloader exited with non-zero status"
        );
        return Err(MediaError::download_failed(
            format!("{} failed for {}", options.program, video_id),
            status.code(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_args() {
        let args = build_fetch_args(&VideoId::from("abc123"), Path::new("/d/abc123_raw.mp4"), "mp4");
        assert_eq!(
            args,
            vec![
                "https://youtube.com/watch?v=abc123",
                "--quiet",
                "-f",
                "bestvideo[ext=mp4]+bestaudio/best",
                "--output",
                "/d/abc123_raw.mp4",
                "--no-continue",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_downloader() {
        let options = FetchOptions::new("mp4").with_program("kclip-no-such-downloader");
        let result = fetch_video(&VideoId::from("x"), "/tmp/x_raw.mp4", &options).await;
        assert!(matches!(result, Err(MediaError::ToolNotFound(_))));
    }
}
