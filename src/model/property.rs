#![forbid(unsafe_code)]

use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{GraphError, Result};
use crate::security::Visibility;
use crate::types::Timestamp;
use crate::value::PropertyValue;

use super::fetch_hints::FetchHints;
use super::metadata::Metadata;

/// A live, readable property value as materialized for one caller.
#[derive(Clone, Debug)]
pub struct Property {
    pub(crate) key: String,
    pub(crate) name: String,
    pub(crate) value: PropertyValue,
    pub(crate) visibility: Visibility,
    pub(crate) timestamp: Timestamp,
    pub(crate) hidden_visibilities: SmallVec<[Visibility; 2]>,
    pub(crate) metadata: Option<Metadata>,
    pub(crate) hints: Arc<FetchHints>,
}

impl Property {
    /// Property key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Slot visibility.
    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// Timestamp of the write that produced the current value.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Returns `true` when the property is hidden from the reading caller.
    pub fn is_hidden(&self) -> bool {
        !self.hidden_visibilities.is_empty()
    }

    /// Hide visibilities currently hiding the property from the caller.
    pub fn hidden_visibilities(&self) -> &[Visibility] {
        &self.hidden_visibilities
    }

    /// Readable metadata; fails when the fetch hints excluded metadata.
    pub fn metadata(&self) -> Result<&Metadata> {
        self.metadata
            .as_ref()
            .ok_or(GraphError::FetchHintsViolation("property metadata"))
    }

    /// Value of metadata entry `key`; fails when the hints excluded that key.
    pub fn metadata_value(&self, key: &str) -> Result<Option<&PropertyValue>> {
        if !self.hints.property_metadata.includes(key) {
            return Err(GraphError::FetchHintsViolation("property metadata key"));
        }
        Ok(self.metadata()?.value(key))
    }
}

/// One transition of a property slot over time.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoricalPropertyValue {
    /// Property key.
    pub key: String,
    /// Property name.
    pub name: String,
    /// Value written (or, for a delete, the value that was deleted).
    pub value: PropertyValue,
    /// Metadata as of this transition, filtered for the caller.
    pub metadata: Metadata,
    /// Slot visibility.
    pub visibility: Visibility,
    /// When the transition happened.
    pub timestamp: Timestamp,
    /// Whether the transition removed the slot.
    pub deleted: bool,
}

/// Narrows a historical value scan.
#[derive(Clone, Debug, Default)]
pub struct HistoryQuery {
    /// Only this property key.
    pub key: Option<String>,
    /// Only this property name.
    pub name: Option<String>,
    /// Only this slot visibility.
    pub visibility: Option<Visibility>,
    /// Earliest timestamp, inclusive.
    pub start: Option<Timestamp>,
    /// Latest timestamp, inclusive.
    pub end: Option<Timestamp>,
}

impl HistoryQuery {
    /// Every slot of the element.
    pub fn all() -> Self {
        Self::default()
    }

    /// Slots of one `(key, name)`.
    pub fn property(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Restricts to one visibility.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Restricts to `[start, end]`.
    pub fn between(mut self, start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub(crate) fn matches_slot(&self, key: &str, name: &str, visibility: &Visibility) -> bool {
        self.key.as_deref().map_or(true, |k| k == key)
            && self.name.as_deref().map_or(true, |n| n == name)
            && self.visibility.as_ref().map_or(true, |v| v == visibility)
    }

    pub(crate) fn matches_time(&self, timestamp: Timestamp) -> bool {
        self.start.map_or(true, |start| timestamp >= start)
            && self.end.map_or(true, |end| timestamp <= end)
    }
}
