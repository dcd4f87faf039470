//! Deterministic artifact paths.
//!
//! Every file the pipeline produces is named from the video id, the task
//! directory and the segment boundaries alone, so a rerun finds the files an
//! earlier run left behind.

use std::path::{Path, PathBuf};

use crate::segment::TimeRange;
use crate::video::VideoId;

/// Container the acquisition tool falls back to when it cannot merge into the requested one.
pub const FALLBACK_CONTAINER: &str = "mkv";

/// Subdirectory holding event clips in hierarchical mode.
pub const EVENT_VIDEOS_DIR: &str = "event_videos";

/// Subdirectory holding action clips in hierarchical mode.
pub const ACTION_VIDEOS_DIR: &str = "action_videos";

/// Width event boundaries are zero-padded to, so names sort lexically.
pub const BOUNDARY_PAD_WIDTH: usize = 6;

/// `{dir}/{id}_raw.{format}`
pub fn raw_download_path(dir: &Path, video_id: &VideoId, format: &str) -> PathBuf {
    dir.join(format!("{}_raw.{}", video_id, format))
}

/// `{dir}/{id}_raw.mkv`
pub fn fallback_download_path(dir: &Path, video_id: &VideoId) -> PathBuf {
    raw_download_path(dir, video_id, FALLBACK_CONTAINER)
}

/// `{dir}/{id}.{format}`
pub fn flat_clip_path(dir: &Path, video_id: &VideoId, format: &str) -> PathBuf {
    dir.join(format!("{}.{}", video_id, format))
}

/// `{id}_E_{start}_{end}` with padded boundaries.
pub fn event_clip_stem(video_id: &VideoId, event: &TimeRange) -> String {
    format!(
        "{}_E_{}_{}",
        video_id,
        event.start.padded(BOUNDARY_PAD_WIDTH),
        event.end.padded(BOUNDARY_PAD_WIDTH)
    )
}

/// `{dir}/event_videos/{id}_E_{start}_{end}.{format}`
pub fn event_clip_path(dir: &Path, video_id: &VideoId, event: &TimeRange, format: &str) -> PathBuf {
    dir.join(EVENT_VIDEOS_DIR)
        .join(format!("{}.{}", event_clip_stem(video_id, event), format))
}

/// `{dir}/action_videos/{id}_E_{start}_{end}_A_{s}_{e}.{format}`
pub fn action_clip_path(
    dir: &Path,
    video_id: &VideoId,
    event: &TimeRange,
    action: &TimeRange,
    format: &str,
) -> PathBuf {
    dir.join(ACTION_VIDEOS_DIR).join(format!(
        "{}_A_{}_{}.{}",
        event_clip_stem(video_id, event),
        action.start,
        action.end,
        format
    ))
}

/// Path the compressor leaves behind for `path`.
pub fn compressed_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}
