#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use crate::security::{Authorizations, Visibility};
use crate::value::PropertyValue;

use super::fetch_hints::MetadataSelection;

/// One labeled attribute of a property value.
#[derive(Clone, Debug, PartialEq)]
pub struct MetadataEntry {
    key: String,
    value: PropertyValue,
    visibility: Visibility,
}

impl MetadataEntry {
    /// Metadata key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Metadata value.
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Visibility of this entry.
    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }
}

/// Metadata of one property slot, keyed by `(key, visibility)`.
///
/// Writing the same key under a different visibility adds a second entry;
/// writing the same key and visibility overwrites.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    entries: BTreeMap<(String, Visibility), MetadataEntry>,
}

impl Metadata {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Metadata::set`].
    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
        visibility: Visibility,
    ) -> Self {
        self.set(key, value, visibility);
        self
    }

    /// Inserts or overwrites the entry for `(key, visibility)`.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
        visibility: Visibility,
    ) {
        let key = key.into();
        let entry = MetadataEntry {
            key: key.clone(),
            value: value.into(),
            visibility: visibility.clone(),
        };
        self.entries.insert((key, visibility), entry);
    }

    /// First entry for `key` in visibility order.
    pub fn entry(&self, key: &str) -> Option<&MetadataEntry> {
        self.entries.values().find(|entry| entry.key == key)
    }

    /// Entry for exactly `(key, visibility)`.
    pub fn entry_with_visibility(
        &self,
        key: &str,
        visibility: &Visibility,
    ) -> Option<&MetadataEntry> {
        self.entries.get(&(key.to_owned(), visibility.clone()))
    }

    /// Value of the first entry for `key`.
    pub fn value(&self, key: &str) -> Option<&PropertyValue> {
        self.entry(key).map(MetadataEntry::value)
    }

    /// All entries ordered by `(key, visibility)`.
    pub fn entries(&self) -> impl Iterator<Item = &MetadataEntry> {
        self.entries.values()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` without entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy holding only entries readable by `auths` and selected by `selection`.
    pub(crate) fn filtered(&self, auths: &Authorizations, selection: &MetadataSelection) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(_, entry)| selection.includes(&entry.key))
            .filter(|(_, entry)| auths.can_read(&entry.visibility))
            .map(|(k, entry)| (k.clone(), entry.clone()))
            .collect();
        Self { entries }
    }
}
