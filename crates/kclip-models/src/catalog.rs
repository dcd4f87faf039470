//! Annotation catalog.
//!
//! The catalog maps video ids to a label and the segments to cut. Two JSON
//! layouts are understood:
//!
//! - flat, one segment per video:
//!   `{"<id>": {"annotations": {"label": "run", "segment": [0, 10]}}}`
//! - hierarchical, events keyed `E_<start>_<end>` with optional actions keyed
//!   `A_<start>_<end>`:
//!   `{"<id>": {"E_000005_000012": {"segments": {"A_6_8": {}}}}}`

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{ModelError, ModelResult};
use crate::segment::{Event, Segment, TimeRange};
use crate::timestamp::Timestamp;
use crate::video::VideoId;

/// Metadata for one video in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub label: String,
    pub segment: Segment,
}

impl CatalogEntry {
    pub fn flat(label: impl Into<String>, range: TimeRange) -> Self {
        Self {
            label: label.into(),
            segment: Segment::Flat(range),
        }
    }

    pub fn hierarchical(label: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            label: label.into(),
            segment: Segment::Hierarchical(events),
        }
    }

    /// Case-insensitive label comparison.
    pub fn matches_class(&self, class_name: &str) -> bool {
        self.label.to_lowercase() == class_name.to_lowercase()
    }
}

/// Directory name for a class: spaces become underscores.
pub fn class_dir_name(class_name: &str) -> String {
    class_name.replace(' ', "_")
}

/// Mapping from video id to its annotations, iterated in the order the
/// entries were declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<(VideoId, CatalogEntry)>,
    index: HashMap<VideoId, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Re-inserting an id replaces its entry in place.
    pub fn insert(&mut self, video_id: impl Into<VideoId>, entry: CatalogEntry) {
        let video_id = video_id.into();
        match self.index.get(&video_id) {
            Some(&pos) => self.entries[pos].1 = entry,
            None => {
                self.index.insert(video_id.clone(), self.entries.len());
                self.entries.push((video_id, entry));
            }
        }
    }

    pub fn with_entry(mut self, video_id: impl Into<VideoId>, entry: CatalogEntry) -> Self {
        self.insert(video_id, entry);
        self
    }

    pub fn get(&self, video_id: &VideoId) -> Option<&CatalogEntry> {
        self.index.get(video_id).map(|&pos| &self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VideoId, &CatalogEntry)> {
        self.entries.iter().map(|(id, entry)| (id, entry))
    }

    /// Parse the flat JSON layout.
    pub fn from_flat_json(json: &str) -> ModelResult<Self> {
        let records: Map<String, Value> = serde_json::from_str(json)?;

        let mut catalog = Self::new();
        for (id, value) in records {
            let record: FlatRecord = serde_json::from_value(value)?;
            let (start, end) = record.annotations.segment;
            catalog.insert(
                id,
                CatalogEntry::flat(record.annotations.label, TimeRange { start, end }),
            );
        }

        Ok(catalog)
    }

    /// Parse the hierarchical JSON layout.
    pub fn from_hierarchical_json(json: &str) -> ModelResult<Self> {
        let records: Map<String, Value> = serde_json::from_str(json)?;

        let mut catalog = Self::new();
        for (id, events) in records {
            let events: Map<String, Value> = serde_json::from_value(events)?;
            let mut parsed = Vec::with_capacity(events.len());
            for (event_key, record) in events {
                let record: EventRecord = serde_json::from_value(record)?;
                let mut event = Event::new(parse_segment_key(&event_key)?);
                for action_key in record.segments.into_iter().flatten().map(|(k, _)| k) {
                    event.actions.push(parse_segment_key(&action_key)?);
                }
                parsed.push(event);
            }
            catalog.insert(id, CatalogEntry::hierarchical(String::new(), parsed));
        }

        Ok(catalog)
    }

    /// Read and parse a flat catalog file.
    pub fn load_flat(path: impl AsRef<Path>) -> ModelResult<Self> {
        Self::from_flat_json(&std::fs::read_to_string(path)?)
    }

    /// Read and parse a hierarchical catalog file.
    pub fn load_hierarchical(path: impl AsRef<Path>) -> ModelResult<Self> {
        Self::from_hierarchical_json(&std::fs::read_to_string(path)?)
    }
}

impl FromIterator<(VideoId, CatalogEntry)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (VideoId, CatalogEntry)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (video_id, entry) in iter {
            catalog.insert(video_id, entry);
        }
        catalog
    }
}

#[derive(Deserialize)]
struct FlatRecord {
    annotations: FlatAnnotations,
}

#[derive(Deserialize)]
struct FlatAnnotations {
    #[serde(default)]
    label: String,
    segment: (Timestamp, Timestamp),
}

#[derive(Deserialize)]
struct EventRecord {
    #[serde(default)]
    segments: Option<Map<String, Value>>,
}

/// Split `<tag>_<start>_<end>` into a range.
fn parse_segment_key(key: &str) -> ModelResult<TimeRange> {
    let mut parts = key.split('_').skip(1);
    match (parts.next(), parts.next()) {
        (Some(start), Some(end)) if !start.is_empty() && !end.is_empty() => {
            Ok(TimeRange::new(start, end))
        }
        _ => Err(ModelError::invalid_segment_key(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flat_catalog() {
        let json = r#"{
            "vid1": {"annotations": {"label": "run", "segment": [0, 10]}, "duration": 10.0},
            "vid2": {"annotations": {"label": "Jump Rope", "segment": ["1.5", "4"]}}
        }"#;
        let catalog = Catalog::from_flat_json(json).unwrap();
        assert_eq!(catalog.len(), 2);

        let entry = catalog.get(&VideoId::from("vid1")).unwrap();
        assert_eq!(entry.segment, Segment::Flat(TimeRange::new("0", "10")));
        assert!(entry.matches_class("RUN"));

        let entry = catalog.get(&VideoId::from("vid2")).unwrap();
        assert!(entry.matches_class("jump rope"));
        assert_eq!(class_dir_name(&entry.label), "Jump_Rope");
    }

    #[test]
    fn test_hierarchical_catalog() {
        let json = r#"{
            "abc123": {
                "E_000005_000012": {"event": 1, "segments": {"A_6_8": {}, "A_9_11": {}}},
                "E_000020_000030": {"event": 2, "segments": null}
            },
            "empty": {}
        }"#;
        let catalog = Catalog::from_hierarchical_json(json).unwrap();

        let entry = catalog.get(&VideoId::from("abc123")).unwrap();
        let Segment::Hierarchical(events) = &entry.segment else {
            panic!("expected hierarchical segment");
        };
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].range, TimeRange::new("000005", "000012"));
        assert_eq!(
            events[0].actions,
            vec![TimeRange::new("6", "8"), TimeRange::new("9", "11")]
        );
        assert!(events[1].actions.is_empty());

        let entry = catalog.get(&VideoId::from("empty")).unwrap();
        assert_eq!(entry.segment, Segment::Hierarchical(Vec::new()));
    }

    #[test]
    fn test_declared_order_is_kept() {
        let json = r#"{
            "zzz": {
                "E_5_12": {"segments": {"A_6_8": {}, "A_10_11": {}}},
                "E_100_200": {"segments": null}
            },
            "aaa": {}
        }"#;
        let catalog = Catalog::from_hierarchical_json(json).unwrap();

        let ids: Vec<&str> = catalog.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["zzz", "aaa"]);

        let entry = catalog.get(&VideoId::from("zzz")).unwrap();
        let Segment::Hierarchical(events) = &entry.segment else {
            panic!("expected hierarchical segment");
        };
        assert_eq!(events[0].range, TimeRange::new("5", "12"));
        assert_eq!(events[1].range, TimeRange::new("100", "200"));
        assert_eq!(
            events[0].actions,
            vec![TimeRange::new("6", "8"), TimeRange::new("10", "11")]
        );

        let flat = r#"{
            "b": {"annotations": {"label": "x", "segment": [0, 1]}},
            "a": {"annotations": {"label": "x", "segment": [0, 1]}}
        }"#;
        let catalog = Catalog::from_flat_json(flat).unwrap();
        let ids: Vec<&str> = catalog.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_reinsert_replaces_in_place() {
        let catalog = Catalog::new()
            .with_entry("b", CatalogEntry::flat("x", TimeRange::new("0", "1")))
            .with_entry("a", CatalogEntry::flat("x", TimeRange::new("0", "1")))
            .with_entry("b", CatalogEntry::flat("y", TimeRange::new("2", "3")));

        assert_eq!(catalog.len(), 2);
        let ids: Vec<&str> = catalog.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(catalog.get(&VideoId::from("b")).unwrap().label, "y");
    }

    #[test]
    fn test_malformed_segment_key() {
        let json = r#"{"abc": {"E5": {"segments": null}}}"#;
        assert!(matches!(
            Catalog::from_hierarchical_json(json),
            Err(ModelError::InvalidSegmentKey(_))
        ));
    }

    #[test]
    fn test_load_flat_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"v": {{"annotations": {{"label": "x", "segment": [1, 2]}}}}}}"#).unwrap();
        let catalog = Catalog::load_flat(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
    }
}
