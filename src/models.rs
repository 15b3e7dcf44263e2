//! Data models for protest event records and the persisted ledger.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Field`]: An event attribute that is either known or explicitly unspecified
//! - [`SourceSet`]: An ordered, deduplicated set of origin URLs
//! - [`EventRecord`]: A single expected protest/labor-action occurrence
//! - [`Ledger`]: The persisted collection of all known events
//!
//! The ledger file keeps the exact external conventions downstream consumers
//! already rely on: unknown attributes serialize as the literal string
//! `"No especificado"` and a record's sources serialize as one comma-joined
//! string, hence the hand-written serde impls.

use itertools::Itertools;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel used by the ledger file and the extraction model for a value
/// that could not be determined.
pub const UNSPECIFIED: &str = "No especificado";

/// Sort placeholder for records without a date; orders them last.
pub const FAR_FUTURE_DATE: &str = "9999-12-31";

/// Sort placeholder for records without a time; orders them last within a day.
pub const END_OF_DAY: &str = "99:99";

/// An event attribute that is either a concrete value or unspecified.
///
/// A concrete value can never be overwritten by the sentinel or by a
/// competing candidate. The external sentinel string only appears at the
/// serialization boundary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field {
    /// A concrete, non-empty value.
    Specified(String),
    /// The value is unknown; serializes as [`UNSPECIFIED`].
    #[default]
    Unspecified,
}

impl Field {
    /// Whether this field still awaits a concrete value.
    pub fn is_unspecified(&self) -> bool {
        matches!(self, Field::Unspecified)
    }

    /// The concrete value, if any.
    pub fn as_specified(&self) -> Option<&str> {
        match self {
            Field::Specified(s) => Some(s),
            Field::Unspecified => None,
        }
    }

    /// The external text form: the value itself, or the sentinel.
    pub fn as_text(&self) -> &str {
        match self {
            Field::Specified(s) => s,
            Field::Unspecified => UNSPECIFIED,
        }
    }

    /// Adopt `incoming` only if this field is unspecified and `incoming` is
    /// concrete. A known value is never overwritten.
    pub fn fill_from(&mut self, incoming: &Field) {
        if self.is_unspecified() {
            if let Field::Specified(v) = incoming {
                *self = Field::Specified(v.clone());
            }
        }
    }
}

impl From<&str> for Field {
    fn from(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == UNSPECIFIED {
            Field::Unspecified
        } else {
            Field::Specified(trimmed.to_string())
        }
    }
}

impl From<String> for Field {
    fn from(raw: String) -> Self {
        Field::from(raw.as_str())
    }
}

impl From<Option<String>> for Field {
    fn from(raw: Option<String>) -> Self {
        match raw {
            Some(s) => Field::from(s),
            None => Field::Unspecified,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_text())
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Field::from(raw))
    }
}

/// An ordered, deduplicated set of origin URLs.
///
/// Insertion preserves first-seen order. Serializes to the comma-joined
/// string the ledger file uses; deserializes from either that string or a
/// plain list of URLs (both forms exist in historical ledgers).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceSet(Vec<String>);

impl SourceSet {
    pub fn new() -> Self {
        SourceSet(Vec::new())
    }

    /// A set holding a single origin URL.
    pub fn single(url: impl Into<String>) -> Self {
        let mut set = SourceSet::new();
        set.insert(&url.into());
        set
    }

    /// Insert a URL, keeping first-seen order. Returns `true` if it was new.
    pub fn insert(&mut self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() || self.contains(url) {
            return false;
        }
        self.0.push(url.to_string());
        true
    }

    /// Union with `other`, appending unseen URLs in `other`'s order.
    pub fn union(&mut self, other: &SourceSet) {
        for url in other.iter() {
            self.insert(url);
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.iter().any(|u| u == url)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The external comma-joined form, e.g. `"url1, url2"`.
    pub fn joined(&self) -> String {
        self.0.join(", ")
    }

    fn from_joined(raw: &str) -> Self {
        SourceSet(
            raw.split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .unique()
                .map(String::from)
                .collect(),
        )
    }
}

impl Serialize for SourceSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.joined())
    }
}

impl<'de> Deserialize<'de> for SourceSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SourceSetVisitor;

        impl<'de> Visitor<'de> for SourceSetVisitor {
            type Value = SourceSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a comma-joined URL string or a list of URLs")
            }

            fn visit_str<E: de::Error>(self, raw: &str) -> Result<SourceSet, E> {
                Ok(SourceSet::from_joined(raw))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<SourceSet, A::Error> {
                let mut set = SourceSet::new();
                while let Some(url) = seq.next_element::<String>()? {
                    set.insert(&url);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_any(SourceSetVisitor)
    }
}

/// A structured description of a single expected future protest event.
///
/// Records are created from one article by the extraction model, then may be
/// merged into an existing record by the consolidation engine. They persist
/// in the ledger indefinitely; consolidation is the only thing that ever
/// removes one, by folding it into another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Calendar date (`YYYY-MM-DD`) the protest is expected to occur.
    #[serde(default)]
    pub date: Field,
    /// Clock time (`HH:MM`) if known.
    #[serde(default)]
    pub time: Field,
    /// Where the event takes place.
    #[serde(default)]
    pub place: Field,
    /// Group, union, or collective organizing the event.
    #[serde(default)]
    pub organizer: Field,
    /// Nature of the action (Paro, Marcha, Piquete, ...).
    #[serde(default)]
    pub measure_type: Field,
    /// Concise summary of the grievance.
    #[serde(default)]
    pub reason: Field,
    /// Origin URLs that contributed to this record.
    #[serde(default)]
    pub sources: SourceSet,
}

impl EventRecord {
    /// Ascending sort key: `(date, time)`, with unknown values ordering last.
    pub fn sort_key(&self) -> (String, String) {
        let date = self
            .date
            .as_specified()
            .unwrap_or(FAR_FUTURE_DATE)
            .to_string();
        let time = self.time.as_specified().unwrap_or(END_OF_DAY).to_string();
        (date, time)
    }
}

/// The persisted event ledger: the system's only durable state and its
/// published output artifact.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    /// ISO-8601 timestamp (with offset) of the last successful run.
    #[serde(default)]
    pub last_updated: String,
    /// All known events, ordered by `(date, time)`.
    #[serde(default)]
    pub events: Vec<EventRecord>,
}
