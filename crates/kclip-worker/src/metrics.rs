//! Run metrics.
//!
//! Counters for task flow and histograms for external tool durations. The
//! binary installs a Prometheus recorder and writes a text snapshot at the end
//! of a run; without a recorder every call here is a no-op.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::path::Path;
use std::time::Duration;

/// Metric names as constants for consistency.
pub mod names {
    pub const TASKS_ENQUEUED_TOTAL: &str = "kclip_tasks_enqueued_total";
    pub const TASKS_COMPLETED_TOTAL: &str = "kclip_tasks_completed_total";
    pub const TASKS_FAILED_TOTAL: &str = "kclip_tasks_failed_total";
    pub const ARTIFACTS_SKIPPED_TOTAL: &str = "kclip_artifacts_skipped_total";
    pub const TOOL_DURATION_SECONDS: &str = "kclip_tool_duration_seconds";
    pub const WORKER_PANICS_TOTAL: &str = "kclip_worker_panics_total";
    pub const WORK_QUEUE_DEPTH: &str = "kclip_work_queue_depth";
}

/// Install the Prometheus recorder for this process.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Render the current metrics and write them to `path`.
pub async fn write_snapshot(handle: &PrometheusHandle, path: &Path) -> std::io::Result<()> {
    tokio::fs::write(path, handle.render()).await
}

pub fn record_task_enqueued(queue_depth: usize) {
    counter!(names::TASKS_ENQUEUED_TOTAL).increment(1);
    gauge!(names::WORK_QUEUE_DEPTH).set(queue_depth as f64);
}

pub fn record_task_completed() {
    counter!(names::TASKS_COMPLETED_TOTAL).increment(1);
}

pub fn record_task_failed(stage: &str) {
    counter!(names::TASKS_FAILED_TOTAL, "stage" => stage.to_string()).increment(1);
}

/// `kind` is one of `raw`, `clip`, `action`, `compressed`.
pub fn record_artifact_skipped(kind: &'static str) {
    counter!(names::ARTIFACTS_SKIPPED_TOTAL, "kind" => kind).increment(1);
}

pub fn record_tool_duration(tool: &'static str, elapsed: Duration) {
    histogram!(names::TOOL_DURATION_SECONDS, "tool" => tool).record(elapsed.as_secs_f64());
}

pub fn record_worker_panic() {
    counter!(names::WORKER_PANICS_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::TASKS_FAILED_TOTAL.starts_with("kclip_"));
        assert!(names::TOOL_DURATION_SECONDS.ends_with("_seconds"));
    }

    #[tokio::test]
    async fn test_snapshot_contains_recorded_values() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_task_enqueued(3);
            record_task_failed("trim");
            record_task_failed("trim");
            record_tool_duration("ffmpeg", Duration::from_millis(5));
        });

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("metrics.prom");
        write_snapshot(&handle, &path).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();

        assert!(text.contains("kclip_tasks_enqueued_total 1"));
        assert!(text.contains("kclip_work_queue_depth"));
        assert!(text.contains(r#"kclip_tasks_failed_total{stage="trim"} 2"#));
        assert!(text.contains("kclip_tool_duration_seconds_count"));
    }
}
