//! Queue consumers.

use std::sync::Arc;
use tracing::{debug, error, info, Instrument};

use kclip_media::MediaTools;
use kclip_models::{ClipTask, TaskKind};
use kclip_queue::{FailureSender, QueueMessage, WorkReceiver};

use crate::error::WorkerResult;
use crate::logging::VideoLogger;
use crate::metrics;
use crate::pipeline::{process_video, PipelineOptions, VideoPass};

/// Tasks seen by one worker before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub processed: usize,
    pub failed: usize,
}

/// A single consumer of the work queue.
pub struct Worker<T: ?Sized> {
    id: usize,
    tools: Arc<T>,
    options: Arc<PipelineOptions>,
    tasks: WorkReceiver,
    failures: FailureSender,
}

impl<T> Worker<T>
where
    T: MediaTools + ?Sized,
{
    pub fn new(
        id: usize,
        tools: Arc<T>,
        options: Arc<PipelineOptions>,
        tasks: WorkReceiver,
        failures: FailureSender,
    ) -> Self {
        Self {
            id,
            tools,
            options,
            tasks,
            failures,
        }
    }

    /// Consume tasks until a shutdown sentinel arrives or the queue closes.
    pub async fn run(self) -> WorkerStats {
        let mut stats = WorkerStats::default();
        debug!(worker_id = self.id, "Worker started");

        loop {
            let task = match self.tasks.recv().await {
                Some(QueueMessage::Item(task)) => task,
                Some(QueueMessage::Shutdown) => break,
                None => {
                    debug!(worker_id = self.id, "Work queue closed");
                    break;
                }
            };

            stats.processed += 1;
            let logger = VideoLogger::new(&task.video_id, self.id);
            let span = logger.create_span();

            let result = process_task(self.tools.as_ref(), &self.options, &task, &logger)
                .instrument(span)
                .await;

            match result {
                Ok(()) => {
                    metrics::record_task_completed();
                    logger.log_completion();
                }
                Err(e) => {
                    stats.failed += 1;
                    logger.log_error(e.stage().as_str(), e.exit_code(), &e.to_string());

                    let record = e.to_failure_record(&task.video_id);
                    if let Err(send_err) = self.failures.send(record).await {
                        error!(
                            worker_id = self.id,
                            video_id = %task.video_id,
                            "Failed to record failure: {}", send_err
                        );
                    }
                }
            }
        }

        info!(
            worker_id = self.id,
            processed = stats.processed,
            failed = stats.failed,
            "Worker stopped"
        );
        stats
    }
}

/// Run every pass of a task.
///
/// Events of a hierarchical task run in order and stop at the first failure;
/// that failure stands for the whole video.
pub async fn process_task<T>(
    tools: &T,
    options: &PipelineOptions,
    task: &ClipTask,
    logger: &VideoLogger,
) -> WorkerResult<()>
where
    T: MediaTools + ?Sized,
{
    logger.log_start(task.pass_count());

    match &task.kind {
        TaskKind::Flat(span) => {
            let pass = VideoPass::flat(&task.video_id, &task.directory, span);
            process_video(tools, options, pass, logger).await
        }
        TaskKind::Hierarchical(events) => {
            for (index, event) in events.iter().enumerate() {
                let pass =
                    VideoPass::event(&task.video_id, &task.directory, &event.span, &event.actions);
                if let Err(e) = process_video(tools, options, pass, logger).await {
                    let skipped = events.len() - index - 1;
                    if skipped > 0 {
                        logger.log_warning(&format!("skipping {} remaining event(s)", skipped));
                    }
                    return Err(e);
                }
            }
            Ok(())
        }
    }
}
