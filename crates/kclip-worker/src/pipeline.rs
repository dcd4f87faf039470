//! Per-video processing pipeline.
//!
//! One pass turns a video id and a span into its artifacts:
//!
//! 1. fetch the raw download unless one is already on disk (the downloader may
//!    leave an `mkv` instead of the requested container)
//! 2. cut the span out of the download
//! 3. in hierarchical mode, cut every action out of the event clip
//! 4. compress the final artifact
//!
//! Existing artifacts are kept unless `overwrite` is set. Clips are written
//! to a unique staging file next to their destination and renamed into place,
//! so two passes racing on the same artifact never leave a partial file.

use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;

use kclip_media::{MediaResult, MediaTools};
use kclip_models::{
    action_clip_path, compressed_path, event_clip_path, fallback_download_path, flat_clip_path,
    raw_download_path, Span, TimeRange, VideoId,
};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::VideoLogger;
use crate::metrics;

/// Flags shared by every pass of a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Preferred container; also the extension of every clip.
    pub format: String,
    pub compress: bool,
    /// Re-produce clips that already exist. Raw downloads are never re-fetched.
    pub overwrite: bool,
    /// When false the raw download is the final artifact.
    pub cut: bool,
    pub fetch_log: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            format: "mp4".to_string(),
            compress: false,
            overwrite: false,
            cut: true,
            fetch_log: None,
        }
    }
}

/// Inputs of a single pass.
#[derive(Debug, Clone, Copy)]
pub struct VideoPass<'a> {
    pub video_id: &'a VideoId,
    pub directory: &'a Path,
    pub span: &'a Span,
    /// Inner ranges cut from the event clip. Ignored outside hierarchical mode.
    pub actions: &'a [TimeRange],
    /// Selects event/action naming instead of the flat layout.
    pub hierarchical: bool,
}

impl<'a> VideoPass<'a> {
    pub fn flat(video_id: &'a VideoId, directory: &'a Path, span: &'a Span) -> Self {
        Self {
            video_id,
            directory,
            span,
            actions: &[],
            hierarchical: false,
        }
    }

    pub fn event(
        video_id: &'a VideoId,
        directory: &'a Path,
        span: &'a Span,
        actions: &'a [TimeRange],
    ) -> Self {
        Self {
            video_id,
            directory,
            span,
            actions,
            hierarchical: true,
        }
    }

    /// Where the cut of the span lands, if the span is a range.
    fn outer_clip(&self, format: &str) -> Option<(PathBuf, &'a TimeRange)> {
        let span: &'a Span = self.span;
        let range = span.range()?;
        let path = if self.hierarchical {
            event_clip_path(self.directory, self.video_id, range, format)
        } else {
            flat_clip_path(self.directory, self.video_id, format)
        };
        Some((path, range))
    }
}

/// Present as a plain file or as its compressed sibling.
fn artifact_present(path: &Path) -> bool {
    path.exists() || compressed_path(path).exists()
}

/// Run one pass of the pipeline.
pub async fn process_video<T>(
    tools: &T,
    options: &PipelineOptions,
    pass: VideoPass<'_>,
    logger: &VideoLogger,
) -> WorkerResult<()>
where
    T: MediaTools + ?Sized,
{
    let raw = raw_download_path(pass.directory, pass.video_id, &options.format);
    let fallback = fallback_download_path(pass.directory, pass.video_id);

    let outer = if options.cut {
        pass.outer_clip(&options.format)
    } else {
        None
    };

    let pending_actions: Vec<(PathBuf, &TimeRange)> = match &outer {
        Some((_, event)) if pass.hierarchical => pass
            .actions
            .iter()
            .map(|action| {
                let path = action_clip_path(
                    pass.directory,
                    pass.video_id,
                    event,
                    action,
                    &options.format,
                );
                (path, action)
            })
            .filter(|(path, _)| {
                let present = artifact_present(path);
                if present && !options.overwrite {
                    logger.log_skip(&path.display().to_string());
                    metrics::record_artifact_skipped("action");
                }
                options.overwrite || !present
            })
            .collect(),
        _ => Vec::new(),
    };

    // Action trims read the event clip, so a compressed one does not count.
    let outer_needed = match &outer {
        Some((path, _)) => {
            options.overwrite
                || !(path.exists() || (pending_actions.is_empty() && artifact_present(path)))
        }
        None => false,
    };

    // Step 1: fetch
    let raw_on_disk = raw.exists() || fallback.exists();
    let raw_archived = compressed_path(&raw).exists() || compressed_path(&fallback).exists();
    if !raw_on_disk && (outer_needed || !raw_archived) {
        logger.log_stage("fetch", &raw.display().to_string());
        let started = Instant::now();
        tools
            .fetch(pass.video_id, &raw, &options.format, options.fetch_log.as_deref())
            .await
            .map_err(|e| WorkerError::fetch_failed(pass.video_id, e))?;
        metrics::record_tool_duration("downloader", started.elapsed());

        if !raw.exists() && !fallback.exists() {
            return Err(WorkerError::fetch_failed(
                pass.video_id,
                kclip_media::MediaError::FileNotFound(raw),
            ));
        }
    } else {
        logger.log_skip(&raw.display().to_string());
        metrics::record_artifact_skipped("raw");
    }

    let source = if !raw.exists() && fallback.exists() {
        fallback
    } else {
        raw
    };

    // Step 2: cut the span
    let final_artifact = match &outer {
        Some((path, range)) => {
            if outer_needed {
                logger.log_stage("trim", &path.display().to_string());
                trim_into_place(tools, &source, path, range)
                    .await
                    .map_err(|e| WorkerError::trim_failed(path, e))?;
            } else {
                logger.log_skip(&path.display().to_string());
                metrics::record_artifact_skipped("clip");
            }
            path.clone()
        }
        None => source,
    };

    // Step 3: nested trims; every action is attempted, the first error wins
    let mut first_error = None;
    for (path, action) in &pending_actions {
        logger.log_stage("trim", &path.display().to_string());
        if let Err(e) = trim_into_place(tools, &final_artifact, path, action).await {
            logger.log_warning(&format!("action clip {} failed: {}", path.display(), e));
            first_error.get_or_insert(WorkerError::trim_failed(path, e));
        }
    }
    if let Some(err) = first_error {
        return Err(err);
    }

    // Step 4: compress
    if options.compress {
        if final_artifact.exists() {
            logger.log_stage("compress", &final_artifact.display().to_string());
            let started = Instant::now();
            tools
                .compress(&final_artifact)
                .await
                .map_err(|e| WorkerError::compress_failed(&final_artifact, e))?;
            metrics::record_tool_duration("compressor", started.elapsed());
        } else if compressed_path(&final_artifact).exists() {
            logger.log_skip(&compressed_path(&final_artifact).display().to_string());
            metrics::record_artifact_skipped("compressed");
        } else {
            return Err(WorkerError::compress_failed(
                &final_artifact,
                kclip_media::MediaError::FileNotFound(final_artifact.clone()),
            ));
        }
    }

    Ok(())
}

/// Trim into a staging sibling, then rename over `dest`.
async fn trim_into_place<T>(tools: &T, src: &Path, dest: &Path, range: &TimeRange) -> MediaResult<()>
where
    T: MediaTools + ?Sized,
{
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let staging = staging_path(dest);
    let started = Instant::now();
    match tools.trim(src, &staging, range).await {
        Ok(()) => {
            metrics::record_tool_duration("ffmpeg", started.elapsed());
            if let Err(e) = tokio::fs::rename(&staging, dest).await {
                remove_staging(&staging).await;
                return Err(e.into());
            }
            Ok(())
        }
        Err(e) => {
            remove_staging(&staging).await;
            Err(e)
        }
    }
}

async fn remove_staging(staging: &Path) {
    if let Err(e) = tokio::fs::remove_file(staging).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %staging.display(), "Failed to remove staging file: {}", e);
        }
    }
}

/// `{dir}/.{stem}.{uuid}.partial.{ext}`; keeps the extension so the
/// trimmer still infers the container from it.
fn staging_path(dest: &Path) -> PathBuf {
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let token = uuid::Uuid::new_v4().simple().to_string();
    let name = match dest.extension() {
        Some(ext) => format!(".{}.{}.partial.{}", stem, token, ext.to_string_lossy()),
        None => format!(".{}.{}.partial", stem, token),
    };
    dest.with_file_name(name)
}
