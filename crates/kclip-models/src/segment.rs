//! Time segments inside a video.

use serde::{Deserialize, Serialize};

use crate::timestamp::{Timestamp, TimestampError};

/// A `(start, end)` pair of boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    pub fn new(start: impl Into<Timestamp>, end: impl Into<Timestamp>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Length of the range in seconds.
    ///
    /// Returns `Ok(None)` when the end does not come after the start.
    pub fn duration_secs(&self) -> Result<Option<f64>, TimestampError> {
        let start = self.start.seconds()?;
        let end = self.end.seconds()?;
        Ok((end > start).then(|| end - start))
    }
}

/// The portion of a video a pipeline pass works on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Span {
    /// No segmentation requested; the whole download is the result.
    Whole,
    /// Cut the given range out of the download.
    Range(TimeRange),
}

impl Span {
    /// Build a span from catalog boundaries, mapping a `-1` boundary to [`Span::Whole`].
    pub fn from_bounds(start: Timestamp, end: Timestamp) -> Self {
        if start.is_sentinel() || end.is_sentinel() {
            Span::Whole
        } else {
            Span::Range(TimeRange { start, end })
        }
    }

    pub fn range(&self) -> Option<&TimeRange> {
        match self {
            Span::Whole => None,
            Span::Range(range) => Some(range),
        }
    }
}

impl From<TimeRange> for Span {
    fn from(range: TimeRange) -> Self {
        Span::from_bounds(range.start, range.end)
    }
}

/// An outer time segment with the inner actions nested in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub range: TimeRange,
    /// Inner ranges, relative to the event clip, in catalog order.
    #[serde(default)]
    pub actions: Vec<TimeRange>,
}

impl Event {
    pub fn new(range: TimeRange) -> Self {
        Self {
            range,
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: TimeRange) -> Self {
        self.actions.push(action);
        self
    }
}

/// Segmentation declared for one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    /// A single clip per video.
    Flat(TimeRange),
    /// Zero or more events, each with nested actions.
    Hierarchical(Vec<Event>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_from_bounds() {
        assert_eq!(Span::from_bounds(Timestamp::sentinel(), Timestamp::sentinel()), Span::Whole);
        assert_eq!(Span::from_bounds("5".into(), Timestamp::sentinel()), Span::Whole);
        assert_eq!(
            Span::from_bounds("5".into(), "12".into()),
            Span::Range(TimeRange::new("5", "12"))
        );
    }

    #[test]
    fn test_duration() {
        assert_eq!(TimeRange::new("5", "12").duration_secs().unwrap(), Some(7.0));
        assert_eq!(TimeRange::new("00:01:00", "00:00:30").duration_secs().unwrap(), None);
        assert!(TimeRange::new("x", "3").duration_secs().is_err());
    }
}
