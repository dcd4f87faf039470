//! Failure sink.
//!
//! The only writer of the failure log. Each record becomes one line holding
//! the video id, flushed before the next record is taken, so the log survives
//! an abrupt stop. Stage and exit code go to the structured log instead.

use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use kclip_models::FailureRecord;
use kclip_queue::{FailureReceiver, QueueMessage};

use crate::error::WorkerResult;
use crate::metrics;

/// Records handled by the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub recorded: usize,
    pub write_errors: usize,
}

pub struct FailureSink {
    failures: FailureReceiver,
    log_path: Option<PathBuf>,
}

impl FailureSink {
    pub fn new(failures: FailureReceiver, log_path: Option<PathBuf>) -> Self {
        Self { failures, log_path }
    }

    /// Open the failure log for appending, creating it if needed.
    pub async fn open_log(&self) -> WorkerResult<Option<File>> {
        match &self.log_path {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await?;
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }

    /// Consume records until the shutdown sentinel.
    ///
    /// Write errors are logged and the sink keeps draining, so workers never
    /// block on a full failure queue.
    pub async fn run(self, mut log: Option<File>) -> SinkReport {
        let mut report = SinkReport::default();

        while let Some(QueueMessage::Item(record)) = self.failures.recv().await {
            report.recorded += 1;
            metrics::record_task_failed(record.stage.as_str());
            warn!(
                video_id = %record.video_id,
                stage = %record.stage,
                exit_code = ?record.exit_code,
                "Recording failed video: {}", record.message
            );

            if let Some(file) = log.as_mut() {
                if let Err(e) = append_record(file, &record).await {
                    report.write_errors += 1;
                    error!(video_id = %record.video_id, "Failed to write failure log: {}", e);
                }
            }
        }

        info!(
            recorded = report.recorded,
            write_errors = report.write_errors,
            "Failure sink stopped"
        );
        report
    }
}

async fn append_record(file: &mut File, record: &FailureRecord) -> std::io::Result<()> {
    file.write_all(record.log_line().as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use kclip_models::{FailureStage, VideoId};
    use kclip_queue::failure_queue;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_appends_one_id_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed.txt");
        std::fs::write(&path, "old\n").unwrap();

        let (tx, rx) = failure_queue(4).unwrap();
        let sink = FailureSink::new(rx, Some(path.clone()));
        let log = sink.open_log().await.unwrap();
        let handle = tokio::spawn(sink.run(log));

        for id in ["vid1", "vid2"] {
            let record = FailureRecord::new(VideoId::from(id), FailureStage::Fetch, "exit 1")
                .with_exit_code(Some(1));
            tx.send(record).await.unwrap();
        }
        tx.send_shutdown().await.unwrap();

        let report = handle.await.unwrap();
        assert_eq!(report.recorded, 2);
        assert_eq!(report.write_errors, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old\nvid1\nvid2\n");
    }

    #[tokio::test]
    async fn test_without_log_path_only_logs() {
        let (tx, rx) = failure_queue(1).unwrap();
        let sink = FailureSink::new(rx, None);
        let log = sink.open_log().await.unwrap();
        assert!(log.is_none());
        let handle = tokio::spawn(sink.run(log));

        tx.send(FailureRecord::new(VideoId::from("x"), FailureStage::Trim, "boom"))
            .await
            .unwrap();
        tx.send_shutdown().await.unwrap();

        assert_eq!(handle.await.unwrap().recorded, 1);
    }

    #[tokio::test]
    async fn test_unopenable_log_is_an_error() {
        let dir = TempDir::new().unwrap();
        let (_tx, rx) = failure_queue(1).unwrap();
        let sink = FailureSink::new(rx, Some(dir.path().join("missing/failed.txt")));
        assert!(sink.open_log().await.is_err());
    }
}
