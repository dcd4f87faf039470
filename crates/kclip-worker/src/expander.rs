//! Task expander.
//!
//! Turns the catalog into [`ClipTask`]s and feeds them to the work queue.
//! Sends wait while the queue is full, so the expander never runs more than
//! the queue capacity ahead of the workers.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use kclip_models::{
    class_dir_name, Catalog, ClipTask, EventTask, Segment, Span, TimeRange, VideoId,
    ACTION_VIDEOS_DIR, EVENT_VIDEOS_DIR,
};
use kclip_queue::WorkSender;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::metrics;

/// How the catalog is split into tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpansionMode {
    /// One task per video and span. With `classes`, only matching labels are
    /// expanded, each into its own subdirectory.
    Flat {
        classes: Option<Vec<String>>,
        skip_existing: bool,
    },
    /// One task per video carrying all of its events.
    Hierarchical,
}

/// Outcome of feeding the work queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedReport {
    pub enqueued: usize,
    pub skipped_classes: usize,
    /// Feeding stopped early on a shutdown request.
    pub interrupted: bool,
}

/// Produces tasks from a catalog.
#[derive(Debug, Clone)]
pub struct TaskExpander {
    catalog: Arc<Catalog>,
    root: PathBuf,
    mode: ExpansionMode,
}

impl TaskExpander {
    pub fn new(catalog: Arc<Catalog>, root: impl Into<PathBuf>, mode: ExpansionMode) -> Self {
        Self {
            catalog,
            root: root.into(),
            mode,
        }
    }

    pub fn flat(
        catalog: Arc<Catalog>,
        root: impl Into<PathBuf>,
        classes: Option<Vec<String>>,
    ) -> Self {
        Self::new(
            catalog,
            root,
            ExpansionMode::Flat {
                classes,
                skip_existing: false,
            },
        )
    }

    pub fn hierarchical(catalog: Arc<Catalog>, root: impl Into<PathBuf>) -> Self {
        Self::new(catalog, root, ExpansionMode::Hierarchical)
    }

    /// Build the expander a run configuration asks for.
    pub fn from_config(catalog: Arc<Catalog>, config: &WorkerConfig) -> Self {
        let mode = if config.hierarchical {
            ExpansionMode::Hierarchical
        } else {
            ExpansionMode::Flat {
                classes: config.classes.clone(),
                skip_existing: config.skip_existing_classes,
            }
        };
        Self::new(catalog, config.output_dir.clone(), mode)
    }

    /// Do not enumerate classes whose directory already exists.
    pub fn skip_existing_classes(mut self, skip: bool) -> Self {
        if let ExpansionMode::Flat { skip_existing, .. } = &mut self.mode {
            *skip_existing = skip;
        }
        self
    }

    pub fn mode(&self) -> &ExpansionMode {
        &self.mode
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Flat tasks for one class (or every entry when `class` is `None`),
    /// in catalog order.
    pub fn class_tasks<'a>(
        &'a self,
        class: Option<&'a str>,
        dir: &'a Path,
    ) -> impl Iterator<Item = ClipTask> + 'a {
        self.catalog
            .iter()
            .filter(move |(_, entry)| class.map_or(true, |c| entry.matches_class(c)))
            .filter_map(move |(id, entry)| match &entry.segment {
                Segment::Flat(range) => {
                    check_range(id, range);
                    Some(ClipTask::flat(id.clone(), dir, Span::from(range.clone())))
                }
                Segment::Hierarchical(_) => {
                    warn!(video_id = %id, "Entry has events, not expanded in flat mode");
                    None
                }
            })
    }

    /// One task per video, in catalog order.
    pub fn hierarchical_tasks(&self) -> impl Iterator<Item = ClipTask> + '_ {
        self.catalog.iter().map(move |(id, entry)| {
            let events = match &entry.segment {
                Segment::Hierarchical(events) if !events.is_empty() => events
                    .iter()
                    .inspect(|event| check_range(id, &event.range))
                    .map(EventTask::from)
                    .collect(),
                Segment::Flat(range) => vec![EventTask {
                    span: Span::from(range.clone()),
                    actions: Vec::new(),
                }],
                Segment::Hierarchical(_) => vec![EventTask::whole_video()],
            };
            ClipTask::hierarchical(id.clone(), &self.root, events)
        })
    }

    /// Push every task onto `tx`, stopping early once `shutdown` turns true.
    pub async fn feed(
        &self,
        tx: &WorkSender,
        shutdown: &mut watch::Receiver<bool>,
    ) -> WorkerResult<FeedReport> {
        let mut report = FeedReport::default();

        match &self.mode {
            ExpansionMode::Flat { classes: None, .. } => {
                ensure_dir(&self.root).await?;
                send_all(self.class_tasks(None, &self.root), tx, shutdown, &mut report).await?;
            }
            ExpansionMode::Flat {
                classes: Some(classes),
                skip_existing,
            } => {
                for class in classes {
                    if report.interrupted {
                        break;
                    }

                    let dir = self.root.join(class_dir_name(class));
                    if *skip_existing && dir.is_dir() {
                        info!(
                            class = %class,
                            dir = %dir.display(),
                            "Class directory exists, skipping"
                        );
                        report.skipped_classes += 1;
                        continue;
                    }

                    ensure_dir(&dir).await?;
                    debug!(class = %class, dir = %dir.display(), "Expanding class");
                    send_all(
                        self.class_tasks(Some(class.as_str()), &dir),
                        tx,
                        shutdown,
                        &mut report,
                    )
                    .await?;
                }
            }
            ExpansionMode::Hierarchical => {
                ensure_dir(&self.root.join(EVENT_VIDEOS_DIR)).await?;
                ensure_dir(&self.root.join(ACTION_VIDEOS_DIR)).await?;
                send_all(self.hierarchical_tasks(), tx, shutdown, &mut report).await?;
            }
        }

        info!(
            enqueued = report.enqueued,
            skipped_classes = report.skipped_classes,
            interrupted = report.interrupted,
            "Task expansion finished"
        );
        Ok(report)
    }
}

async fn send_all(
    tasks: impl Iterator<Item = ClipTask>,
    tx: &WorkSender,
    shutdown: &mut watch::Receiver<bool>,
    report: &mut FeedReport,
) -> WorkerResult<()> {
    for task in tasks {
        if *shutdown.borrow() {
            report.interrupted = true;
            return Ok(());
        }

        let video_id = task.video_id.clone();
        tokio::select! {
            biased;
            result = tx.send(task) => result?,
            _ = shutdown_requested(shutdown) => {
                report.interrupted = true;
                return Ok(());
            }
        }

        report.enqueued += 1;
        metrics::record_task_enqueued(tx.len());
        debug!(video_id = %video_id, "Task enqueued");
    }
    Ok(())
}

/// Resolves once shutdown is requested; never if the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn ensure_dir(path: &Path) -> std::io::Result<()> {
    match tokio::fs::create_dir_all(path).await {
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        other => other,
    }
}

/// Inverted ranges are still enqueued; the trimmer decides what they produce.
fn check_range(video_id: &VideoId, range: &TimeRange) {
    match range.duration_secs() {
        Ok(Some(_)) => {}
        Ok(None) => warn!(
            video_id = %video_id,
            start = %range.start,
            end = %range.end,
            "Segment end does not come after its start"
        ),
        Err(e) => debug!(video_id = %video_id, "Unparsed segment boundary: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kclip_models::{CatalogEntry, Event, TaskKind};
    use kclip_queue::{work_queue, QueueMessage, WorkReceiver};
    use std::time::Duration;
    use tempfile::TempDir;

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::new()
                .with_entry("a1", CatalogEntry::flat("run", TimeRange::new("0", "10")))
                .with_entry("b2", CatalogEntry::flat("Jump Rope", TimeRange::new("1", "4")))
                .with_entry("c3", CatalogEntry::flat("RUN", TimeRange::new("-1", "-1"))),
        )
    }

    async fn drain(rx: &WorkReceiver, count: usize) -> Vec<ClipTask> {
        let mut tasks = Vec::new();
        for _ in 0..count {
            match rx.recv().await {
                Some(QueueMessage::Item(task)) => tasks.push(task),
                other => panic!("unexpected message {:?}", other),
            }
        }
        tasks
    }

    #[tokio::test]
    async fn test_flat_classes_get_their_own_directory() {
        let root = TempDir::new().unwrap();
        let expander = TaskExpander::flat(
            catalog(),
            root.path(),
            Some(vec!["run".to_string(), "jump rope".to_string()]),
        );
        let (tx, rx) = work_queue(16).unwrap();
        let (_stop, mut shutdown) = watch::channel(false);

        let report = expander.feed(&tx, &mut shutdown).await.unwrap();
        assert_eq!(report.enqueued, 3);
        assert!(!report.interrupted);

        let tasks = drain(&rx, 3).await;
        let run_dir = root.path().join("run");
        let jump_dir = root.path().join("jump_rope");
        assert!(run_dir.is_dir());
        assert!(jump_dir.is_dir());

        assert_eq!(tasks[0].video_id.as_str(), "a1");
        assert_eq!(tasks[0].directory, run_dir);
        assert_eq!(
            tasks[0].kind,
            TaskKind::Flat(Span::Range(TimeRange::new("0", "10")))
        );
        assert_eq!(tasks[1].video_id.as_str(), "c3");
        assert_eq!(tasks[1].kind, TaskKind::Flat(Span::Whole));
        assert_eq!(tasks[2].video_id.as_str(), "b2");
        assert_eq!(tasks[2].directory, jump_dir);
    }

    #[tokio::test]
    async fn test_existing_class_directory_is_tolerated_or_skipped() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("run")).unwrap();
        let classes = Some(vec!["run".to_string(), "jump rope".to_string()]);

        let (tx, _rx) = work_queue(16).unwrap();
        let (_stop, mut shutdown) = watch::channel(false);
        let report = TaskExpander::flat(catalog(), root.path(), classes.clone())
            .feed(&tx, &mut shutdown)
            .await
            .unwrap();
        assert_eq!(report.enqueued, 3);

        let (tx, _rx) = work_queue(16).unwrap();
        let report = TaskExpander::flat(catalog(), root.path(), classes)
            .skip_existing_classes(true)
            .feed(&tx, &mut shutdown)
            .await
            .unwrap();
        // Both class directories exist after the first run.
        assert_eq!(report.enqueued, 0);
        assert_eq!(report.skipped_classes, 2);
    }

    #[tokio::test]
    async fn test_hierarchical_tasks_and_directories() {
        let root = TempDir::new().unwrap();
        let catalog = Arc::new(
            Catalog::new()
                .with_entry(
                    "abc123",
                    CatalogEntry::hierarchical(
                        "",
                        vec![
                            Event::new(TimeRange::new("5", "12"))
                                .with_action(TimeRange::new("6", "8")),
                            Event::new(TimeRange::new("20", "30")),
                        ],
                    ),
                )
                .with_entry("bare", CatalogEntry::hierarchical("", Vec::new())),
        );
        let expander = TaskExpander::hierarchical(catalog, root.path());
        let (tx, rx) = work_queue(4).unwrap();
        let (_stop, mut shutdown) = watch::channel(false);

        let report = expander.feed(&tx, &mut shutdown).await.unwrap();
        assert_eq!(report.enqueued, 2);
        assert!(root.path().join(EVENT_VIDEOS_DIR).is_dir());
        assert!(root.path().join(ACTION_VIDEOS_DIR).is_dir());

        let tasks = drain(&rx, 2).await;
        assert_eq!(tasks[0].pass_count(), 2);
        let TaskKind::Hierarchical(events) = &tasks[0].kind else {
            panic!("expected hierarchical task");
        };
        assert_eq!(events[0].actions, vec![TimeRange::new("6", "8")]);

        assert_eq!(
            tasks[1].kind,
            TaskKind::Hierarchical(vec![EventTask::whole_video()])
        );
    }

    #[tokio::test]
    async fn test_feed_waits_for_capacity() {
        let root = TempDir::new().unwrap();
        let entries = (0..5).map(|i| {
            (
                VideoId::from(format!("v{}", i)),
                CatalogEntry::flat("run", TimeRange::new("0", "1")),
            )
        });
        let expander = Arc::new(TaskExpander::flat(
            Arc::new(entries.collect()),
            root.path(),
            None,
        ));
        let (tx, rx) = work_queue(2).unwrap();
        let (_stop, mut shutdown) = watch::channel(false);

        let feeder = {
            let expander = Arc::clone(&expander);
            let tx = tx.clone();
            tokio::spawn(async move { expander.feed(&tx, &mut shutdown).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!feeder.is_finished());
        assert_eq!(tx.len(), 2);

        let tasks = drain(&rx, 5).await;
        assert_eq!(tasks.len(), 5);
        let report = feeder.await.unwrap().unwrap();
        assert_eq!(report.enqueued, 5);
    }

    #[tokio::test]
    async fn test_shutdown_stops_blocked_feed() {
        let root = TempDir::new().unwrap();
        let expander = Arc::new(TaskExpander::flat(catalog(), root.path(), None));
        let (tx, _rx) = work_queue(1).unwrap();
        let (stop, mut shutdown) = watch::channel(false);

        let feeder = {
            let expander = Arc::clone(&expander);
            tokio::spawn(async move { expander.feed(&tx, &mut shutdown).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.send(true).unwrap();

        let report = tokio::time::timeout(Duration::from_secs(1), feeder)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(report.interrupted);
        assert_eq!(report.enqueued, 1);
    }
}
