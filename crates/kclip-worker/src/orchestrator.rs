//! Pool orchestrator.
//!
//! Owns both queues, the workers and the failure sink, and walks them through
//! a fixed lifecycle:
//!
//! ```text
//! Idle -> SinkStarted -> WorkersStarted -> Feeding -> Draining -> Stopped
//! ```
//!
//! The sink starts before any worker can produce a failure, and feeding only
//! starts once workers are consuming. Shutdown enqueues one sentinel per
//! worker behind every task already queued, joins the workers, then stops the
//! sink.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use kclip_media::MediaTools;
use kclip_queue::{
    failure_queue, work_queue, FailureReceiver, FailureSender, WorkReceiver, WorkSender,
};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::expander::{FeedReport, TaskExpander};
use crate::metrics;
use crate::pipeline::PipelineOptions;
use crate::sink::{FailureSink, SinkReport};
use crate::worker::{Worker, WorkerStats};

/// Lifecycle state of a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Idle,
    SinkStarted,
    WorkersStarted,
    Feeding,
    Draining,
    Stopped,
}

impl PoolState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolState::Idle => "idle",
            PoolState::SinkStarted => "sink_started",
            PoolState::WorkersStarted => "workers_started",
            PoolState::Feeding => "feeding",
            PoolState::Draining => "draining",
            PoolState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub enqueued: usize,
    pub processed: usize,
    pub failed: usize,
    pub worker_panics: usize,
    /// Failures written by the sink.
    pub recorded: usize,
    pub interrupted: bool,
}

/// A fixed-size pool of workers fed from one catalog.
pub struct Pool<T: ?Sized> {
    config: WorkerConfig,
    tools: Arc<T>,
    state: PoolState,
    work_tx: Option<WorkSender>,
    work_rx: Option<WorkReceiver>,
    failure_tx: Option<FailureSender>,
    failure_rx: Option<FailureReceiver>,
    workers: Vec<JoinHandle<WorkerStats>>,
    sink: Option<JoinHandle<SinkReport>>,
    feed: FeedReport,
}

impl<T> Pool<T>
where
    T: MediaTools + ?Sized + 'static,
{
    /// Validate the configuration and create both queues.
    pub fn new(config: WorkerConfig, tools: Arc<T>) -> WorkerResult<Self> {
        config.validate()?;
        let (work_tx, work_rx) = work_queue(config.queue_capacity)?;
        let (failure_tx, failure_rx) = failure_queue(config.failure_queue_capacity)?;

        Ok(Self {
            config,
            tools,
            state: PoolState::Idle,
            work_tx: Some(work_tx),
            work_rx: Some(work_rx),
            failure_tx: Some(failure_tx),
            failure_rx: Some(failure_rx),
            workers: Vec::new(),
            sink: None,
            feed: FeedReport::default(),
        })
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    fn expect_state(&self, expected: PoolState) -> WorkerResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(WorkerError::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }

    fn transition(&mut self, next: PoolState) {
        info!(from = %self.state, to = %next, "Pool state change");
        self.state = next;
    }

    /// Open the failure log and start the sink.
    pub async fn start_sink(&mut self) -> WorkerResult<()> {
        self.expect_state(PoolState::Idle)?;
        let failures = self.failure_rx.take().ok_or(WorkerError::InvalidState {
            expected: "idle",
            actual: "sink_started",
        })?;

        let sink = FailureSink::new(failures, self.config.failed_log.clone());
        let log = sink.open_log().await?;
        self.sink = Some(tokio::spawn(sink.run(log)));
        self.transition(PoolState::SinkStarted);
        Ok(())
    }

    /// Spawn `num_workers` workers on the shared work queue.
    pub fn start_workers(&mut self) -> WorkerResult<()> {
        self.expect_state(PoolState::SinkStarted)?;
        let (Some(tasks), Some(failures)) = (self.work_rx.take(), self.failure_tx.as_ref()) else {
            return Err(WorkerError::InvalidState {
                expected: "sink_started",
                actual: "workers_started",
            });
        };

        let options: Arc<PipelineOptions> = Arc::new(self.config.pipeline_options());
        for id in 0..self.config.num_workers {
            let worker = Worker::new(
                id,
                Arc::clone(&self.tools),
                Arc::clone(&options),
                tasks.clone(),
                failures.clone(),
            );
            self.workers.push(tokio::spawn(worker.run()));
        }
        // The pool keeps no receiver; sends fail once every worker is gone.
        drop(tasks);

        info!(workers = self.config.num_workers, "Workers started");
        self.transition(PoolState::WorkersStarted);
        Ok(())
    }

    /// Run the expander against the work queue.
    pub async fn feed(
        &mut self,
        expander: &TaskExpander,
        shutdown: &mut watch::Receiver<bool>,
    ) -> WorkerResult<FeedReport> {
        self.expect_state(PoolState::WorkersStarted)?;
        self.transition(PoolState::Feeding);

        let tx = self.work_tx.as_ref().ok_or(WorkerError::InvalidState {
            expected: "feeding",
            actual: "draining",
        })?;
        let report = expander.feed(tx, shutdown).await?;
        self.feed = report;
        Ok(report)
    }

    /// Ordered shutdown: worker sentinels, join workers, sink sentinel, join sink.
    pub async fn shutdown(mut self) -> WorkerResult<PoolReport> {
        if !matches!(self.state, PoolState::WorkersStarted | PoolState::Feeding) {
            return Err(WorkerError::InvalidState {
                expected: "feeding",
                actual: self.state.as_str(),
            });
        }
        self.transition(PoolState::Draining);

        let mut report = PoolReport {
            enqueued: self.feed.enqueued,
            interrupted: self.feed.interrupted,
            ..PoolReport::default()
        };

        if let Some(work_tx) = self.work_tx.take() {
            for _ in 0..self.workers.len() {
                if work_tx.send_shutdown().await.is_err() {
                    warn!("No workers left to receive shutdown");
                    break;
                }
            }
        }

        for (id, handle) in self.workers.drain(..).enumerate() {
            match handle.await {
                Ok(stats) => {
                    report.processed += stats.processed;
                    report.failed += stats.failed;
                }
                Err(e) => {
                    report.worker_panics += 1;
                    metrics::record_worker_panic();
                    error!(worker_id = id, "Worker terminated abnormally: {}", e);
                }
            }
        }

        if let Some(failure_tx) = self.failure_tx.take() {
            if failure_tx.send_shutdown().await.is_err() {
                warn!("Failure sink already stopped");
            }
        }
        if let Some(sink) = self.sink.take() {
            match sink.await {
                Ok(sink_report) => report.recorded = sink_report.recorded,
                Err(e) => error!("Failure sink terminated abnormally: {}", e),
            }
        }

        self.transition(PoolState::Stopped);
        info!(
            enqueued = report.enqueued,
            processed = report.processed,
            failed = report.failed,
            worker_panics = report.worker_panics,
            interrupted = report.interrupted,
            "Pool stopped"
        );
        Ok(report)
    }

    /// Drive a whole run: sink, workers, feeding, ordered shutdown.
    ///
    /// A feeding error still drains the pool before it is returned.
    pub async fn run(
        config: WorkerConfig,
        tools: Arc<T>,
        expander: &TaskExpander,
        mut shutdown: watch::Receiver<bool>,
    ) -> WorkerResult<PoolReport> {
        let mut pool = Self::new(config, tools)?;
        pool.start_sink().await?;
        pool.start_workers()?;

        let fed = pool.feed(expander, &mut shutdown).await;
        if let Err(e) = &fed {
            error!("Feeding stopped: {}", e);
        }

        let report = pool.shutdown().await?;
        fed?;
        Ok(report)
    }
}
