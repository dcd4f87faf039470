//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use kclip_models::TimeRange;

use crate::error::{MediaError, MediaResult};

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "quiet".to_string(),
        }
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Cut between two boundaries, taken verbatim (seconds or `HH:MM:SS`).
    pub fn clip_range(self, range: &TimeRange) -> Self {
        self.output_arg("-ss")
            .output_arg(range.start.as_str())
            .output_arg("-to")
            .output_arg(range.end.as_str())
    }

    /// Allow experimental codecs (`-strict -2`).
    pub fn strict_experimental(self) -> Self {
        self.output_arg("-strict").output_arg("-2")
    }

    /// Copy streams without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set whether an existing output is replaced.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        args.push(if self.overwrite { "-y" } else { "-n" }.to_string());

        args.push("-loglevel".to_string());
        args.push(self.log_level.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    program: String,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegRunner {
    /// Create a runner for the given FFmpeg executable.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run an FFmpeg command to completion.
    ///
    /// There is no timeout: a hung FFmpeg keeps the caller waiting.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        check_tool(&self.program)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", self.program, args.join(" "));

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                status.code(),
            ))
        }
    }
}

/// Check that an executable is reachable through `PATH`.
pub fn check_tool(program: &str) -> MediaResult<PathBuf> {
    which::which(program).map_err(|_| MediaError::tool_not_found(program))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_command_args() {
        let cmd = FfmpegCommand::new("in_raw.mp4", "out.mp4")
            .strict_experimental()
            .clip_range(&TimeRange::new("5", "00:00:12"))
            .codec_copy();

        assert_eq!(
            cmd.build_args(),
            vec![
                "-y", "-loglevel", "quiet", "-i", "in_raw.mp4", "-strict", "-2", "-ss", "5",
                "-to", "00:00:12", "-c", "copy", "out.mp4",
            ]
        );
    }

    #[test]
    fn test_no_overwrite() {
        let args = FfmpegCommand::new("a.mp4", "b.mp4")
            .overwrite(false)
            .log_level("error")
            .build_args();
        assert_eq!(args[0], "-n");
        assert_eq!(args[2], "error");
    }

    #[test]
    fn test_missing_tool() {
        assert!(matches!(
            check_tool("kclip-definitely-not-installed"),
            Err(MediaError::ToolNotFound(_))
        ));
    }
}
