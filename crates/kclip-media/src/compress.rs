//! In-place compression with gzip.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::command::check_tool;
use crate::error::{MediaError, MediaResult};

/// Replace `path` with `path.gz`.
///
/// `-f` lets a stale `path.gz` from an earlier run be replaced.
pub async fn compress_file(program: &str, path: impl AsRef<Path>) -> MediaResult<()> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_tool(program)?;
    debug!("Running compressor: {} -f {}", program, path.display());

    let status = Command::new(program)
        .arg("-f")
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    if !status.success() {
        return Err(MediaError::compress_failed(
            format!("{} exited with non-zero status", program),
            status.code(),
        ));
    }

    info!(path = %path.display(), "Compressed artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let result = compress_file("gzip", dir.path().join("absent.mp4")).await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
