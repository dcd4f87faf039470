//! Segment boundary timestamps.
//!
//! Catalogs carry boundaries either as JSON numbers (`5`, `12.5`) or as
//! strings (`"000005"`, `"00:01:30"`). A [`Timestamp`] keeps the boundary in
//! its textual catalog form, because that form is what ends up in artifact
//! file names and on the transcoder command line. Numeric interpretation is
//! available through [`Timestamp::seconds`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Value marking "no segmentation requested".
pub const SENTINEL_VALUE: f64 = -1.0;

/// A segment boundary in its catalog representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Timestamp(String);

impl Timestamp {
    /// Create a timestamp from its textual form.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    /// The `-1` boundary used when a video carries no segment.
    pub fn sentinel() -> Self {
        Self("-1".to_string())
    }

    /// Whether this boundary is the `-1` sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.0
            .parse::<f64>()
            .map(|v| v == SENTINEL_VALUE)
            .unwrap_or(false)
    }

    /// Get the textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Left-pad with zeros to `width` characters, keeping a leading sign in front.
    ///
    /// Values already at least `width` long are returned unchanged.
    pub fn padded(&self, width: usize) -> String {
        let len = self.0.chars().count();
        if len >= width {
            return self.0.clone();
        }
        let fill = "0".repeat(width - len);
        match self.0.strip_prefix(&['+', '-'][..]) {
            Some(digits) => format!("{}{}{}", &self.0[..1], fill, digits),
            None => format!("{}{}", fill, self.0),
        }
    }

    /// Interpret the boundary as seconds.
    pub fn seconds(&self) -> Result<f64, TimestampError> {
        parse_timestamp(&self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Timestamp {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Timestamp {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<i64> for Timestamp {
    fn from(v: i64) -> Self {
        Self(v.to_string())
    }
}

impl From<f64> for Timestamp {
    fn from(v: f64) -> Self {
        Self(v.to_string())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(serde_json::Number),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Self(n.to_string()),
            Raw::Text(s) => Self::new(s),
        })
    }
}

/// Parse a timestamp string to total seconds.
///
/// Supports formats:
/// - `HH:MM:SS` or `HH:MM:SS.mmm`
/// - `MM:SS` or `MM:SS.mmm`
/// - `SS` or `SS.mmm`
///
/// # Examples
/// ```
/// use kclip_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("000090").unwrap(), 90.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    const COMPONENTS: [&str; 3] = ["hours", "minutes", "seconds"];
    let names = &COMPONENTS[3 - parts.len()..];

    let mut total = 0.0;
    for (part, name) in parts.iter().zip(names) {
        let value: f64 = part
            .parse()
            .map_err(|_| TimestampError::InvalidValue(*name, part.to_string()))?;
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        total = total * 60.0 + value;
    }

    Ok(total)
}

/// Why a boundary could not be read as seconds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("empty boundary")]
    Empty,

    #[error("negative boundary component")]
    Negative,

    #[error("{0} component '{1}' is not a number")]
    InvalidValue(&'static str, String),

    #[error("boundary '{0}' has more than three ':'-separated parts")]
    InvalidFormat(String),
}
