//! External tool wrappers for the kclip pipeline.
//!
//! This crate provides:
//! - Video acquisition through yt-dlp
//! - Stream-copy trimming through FFmpeg
//! - In-place compression through gzip
//! - The [`MediaTools`] trait the worker pipeline is written against

pub mod command;
pub mod compress;
pub mod download;
pub mod error;
pub mod tools;

pub use command::{check_tool, FfmpegCommand, FfmpegRunner};
pub use compress::compress_file;
pub use download::{fetch_video, FetchOptions};
pub use error::{MediaError, MediaResult};
pub use tools::{CliTools, MediaTools, ToolPrograms};
