//! Rule-based entity hints.
//!
//! Hints are derived from the raw query text with literal, case-sensitive
//! substring checks, independently of the intent classifier. Matching is
//! deliberately not word-bounded: "unknown" carries a time hint because it
//! contains "now", and downstream consumers rely on that.

use serde::{Deserialize, Serialize};

/// Substrings that mark a query as location-relative.
pub const LOCATION_MARKERS: &[&str] = &["near", "nearby"];

/// Substrings that mark a query as asking about opening hours.
pub const TIME_MARKERS: &[&str] = &["open", "now", "today"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationHint {
    Nearby,
}

impl LocationHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearby => "nearby",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeHint {
    OpenNow,
}

impl TimeHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenNow => "open_now",
        }
    }
}

/// Hint tags extracted from a query. At most one value per key.
///
/// Serializes as a JSON object holding only the keys that fired, so an
/// empty map is `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_hint: Option<LocationHint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_hint: Option<TimeHint>,
}

impl EntityMap {
    pub fn is_empty(&self) -> bool {
        self.location_hint.is_none() && self.time_hint.is_none()
    }

    pub fn len(&self) -> usize {
        usize::from(self.location_hint.is_some()) + usize::from(self.time_hint.is_some())
    }

    /// Iterate `(key, value)` pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> {
        let location = self.location_hint.map(|h| ("location_hint", h.as_str()));
        let time = self.time_hint.map(|h| ("time_hint", h.as_str()));
        location.into_iter().chain(time)
    }
}

/// Scan `text` for location and time hints. Never fails.
pub fn extract_entities(text: &str) -> EntityMap {
    let mut entities = EntityMap::default();

    if LOCATION_MARKERS.iter().any(|m| text.contains(m)) {
        entities.location_hint = Some(LocationHint::Nearby);
    }

    if TIME_MARKERS.iter().any(|m| text.contains(m)) {
        entities.time_hint = Some(TimeHint::OpenNow);
    }

    entities
}
