//! Units of work placed on the work queue.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::segment::{Event, Span, TimeRange};
use crate::video::VideoId;

/// One event of a hierarchical task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTask {
    /// Outer span; [`Span::Whole`] when the video declared no events.
    pub span: Span,
    /// Inner ranges cut from the outer clip, in order.
    pub actions: Vec<TimeRange>,
}

impl EventTask {
    /// The placeholder pass used for a video without events.
    pub fn whole_video() -> Self {
        Self {
            span: Span::Whole,
            actions: Vec::new(),
        }
    }
}

impl From<&Event> for EventTask {
    fn from(event: &Event) -> Self {
        Self {
            span: Span::from(event.range.clone()),
            actions: event.actions.clone(),
        }
    }
}

/// Segmentation carried by a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Flat(Span),
    Hierarchical(Vec<EventTask>),
}

/// Everything a worker needs to process one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipTask {
    pub video_id: VideoId,
    /// Directory all artifacts of this task are written under.
    pub directory: PathBuf,
    pub kind: TaskKind,
}

impl ClipTask {
    /// Create a flat task with a single span.
    pub fn flat(video_id: impl Into<VideoId>, directory: impl Into<PathBuf>, span: Span) -> Self {
        Self {
            video_id: video_id.into(),
            directory: directory.into(),
            kind: TaskKind::Flat(span),
        }
    }

    /// Create a hierarchical task covering all events of a video.
    pub fn hierarchical(
        video_id: impl Into<VideoId>,
        directory: impl Into<PathBuf>,
        events: Vec<EventTask>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            directory: directory.into(),
            kind: TaskKind::Hierarchical(events),
        }
    }

    pub fn is_hierarchical(&self) -> bool {
        matches!(self.kind, TaskKind::Hierarchical(_))
    }

    /// Number of pipeline passes this task needs.
    pub fn pass_count(&self) -> usize {
        match &self.kind {
            TaskKind::Flat(_) => 1,
            TaskKind::Hierarchical(events) => events.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_task_from_event() {
        let event = Event::new(TimeRange::new("5", "12")).with_action(TimeRange::new("6", "8"));
        let task = EventTask::from(&event);
        assert_eq!(task.span, Span::Range(TimeRange::new("5", "12")));
        assert_eq!(task.actions, vec![TimeRange::new("6", "8")]);
    }

    #[test]
    fn test_pass_count() {
        let flat = ClipTask::flat("a", "/tmp", Span::Whole);
        assert_eq!(flat.pass_count(), 1);
        assert!(!flat.is_hierarchical());

        let tree = ClipTask::hierarchical(
            "b",
            "/tmp",
            vec![EventTask::whole_video(), EventTask::whole_video()],
        );
        assert_eq!(tree.pass_count(), 2);
        assert!(tree.is_hierarchical());
    }
}
