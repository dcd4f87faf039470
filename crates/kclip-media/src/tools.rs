//! The external-operation seam of the pipeline.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use kclip_models::{TimeRange, VideoId};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::compress::compress_file;
use crate::download::{fetch_video, FetchOptions};
use crate::error::MediaResult;

/// The three external operations a worker performs.
///
/// Implementations must be usable from many workers at once.
#[async_trait]
pub trait MediaTools: Send + Sync {
    /// Download `video_id` to `dest` in (at most) `format`.
    async fn fetch(
        &self,
        video_id: &VideoId,
        dest: &Path,
        format: &str,
        log_path: Option<&Path>,
    ) -> MediaResult<()>;

    /// Copy the part of `src` inside `range` to `dest`.
    async fn trim(&self, src: &Path, dest: &Path, range: &TimeRange) -> MediaResult<()>;

    /// Replace `path` with a compressed sibling.
    async fn compress(&self, path: &Path) -> MediaResult<()>;
}

/// Executable names for the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPrograms {
    pub downloader: String,
    pub ffmpeg: String,
    pub compressor: String,
}

impl Default for ToolPrograms {
    fn default() -> Self {
        Self {
            downloader: "yt-dlp".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            compressor: "gzip".to_string(),
        }
    }
}

/// [`MediaTools`] backed by command-line programs.
#[derive(Debug, Clone, Default)]
pub struct CliTools {
    programs: ToolPrograms,
}

impl CliTools {
    pub fn new(programs: ToolPrograms) -> Self {
        Self { programs }
    }

    pub fn programs(&self) -> &ToolPrograms {
        &self.programs
    }
}

#[async_trait]
impl MediaTools for CliTools {
    async fn fetch(
        &self,
        video_id: &VideoId,
        dest: &Path,
        format: &str,
        log_path: Option<&Path>,
    ) -> MediaResult<()> {
        let options = FetchOptions::new(format)
            .with_program(self.programs.downloader.clone())
            .with_log_path(log_path.map(PathBuf::from));
        fetch_video(video_id, dest, &options).await
    }

    async fn trim(&self, src: &Path, dest: &Path, range: &TimeRange) -> MediaResult<()> {
        let cmd = FfmpegCommand::new(src, dest)
            .strict_experimental()
            .clip_range(range)
            .codec_copy();
        FfmpegRunner::new(self.programs.ffmpeg.clone()).run(&cmd).await
    }

    async fn compress(&self, path: &Path) -> MediaResult<()> {
        compress_file(&self.programs.compressor, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;

    #[test]
    fn test_default_programs() {
        let tools = CliTools::default();
        assert_eq!(tools.programs().downloader, "yt-dlp");
        assert_eq!(tools.programs().ffmpeg, "ffmpeg");
        assert_eq!(tools.programs().compressor, "gzip");
    }

    #[tokio::test]
    async fn test_trim_reports_missing_ffmpeg() {
        let tools = CliTools::new(ToolPrograms {
            ffmpeg: "kclip-no-such-ffmpeg".to_string(),
            ..ToolPrograms::default()
        });
        let result = tools
            .trim(Path::new("a.mp4"), Path::new("b.mp4"), &TimeRange::new("0", "1"))
            .await;
        assert!(matches!(result, Err(MediaError::ToolNotFound(_))));
    }
}
