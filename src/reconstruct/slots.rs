#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use crate::model::Metadata;
use crate::security::{Authorizations, Visibility};
use crate::types::Timestamp;
use crate::value::PropertyValue;

use super::hidden::HiddenMarks;

/// Identity of one value: `(key, name, visibility)` for properties and
/// `(column, key, visibility)` for extended-data columns.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) struct SlotKey {
    pub key: String,
    pub name: String,
    pub visibility: Visibility,
}

impl SlotKey {
    pub(crate) fn new(key: &str, name: &str, visibility: &Visibility) -> Self {
        Self {
            key: key.to_owned(),
            name: name.to_owned(),
            visibility: visibility.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct SlotState {
    pub value: PropertyValue,
    pub metadata: Metadata,
    pub timestamp: Timestamp,
    pub live: bool,
    pub hidden: HiddenMarks,
}

/// Folded state of every slot of one element or row.
#[derive(Clone, Debug, Default)]
pub(crate) struct SlotTable {
    slots: BTreeMap<SlotKey, SlotState>,
}

impl SlotTable {
    /// Latest add wins for value and metadata; hidden marks survive re-adds.
    pub(crate) fn add(
        &mut self,
        slot: SlotKey,
        value: &PropertyValue,
        metadata: &Metadata,
        timestamp: Timestamp,
    ) {
        match self.slots.get_mut(&slot) {
            Some(state) => {
                state.value = value.clone();
                state.metadata = metadata.clone();
                state.timestamp = timestamp;
                state.live = true;
            }
            None => {
                self.slots.insert(
                    slot,
                    SlotState {
                        value: value.clone(),
                        metadata: metadata.clone(),
                        timestamp,
                        live: true,
                        hidden: HiddenMarks::default(),
                    },
                );
            }
        }
    }

    /// Soft deletes one visibility of `(key, name)`, or all when `visibility` is `None`.
    /// Returns the slots that were live before the delete.
    pub(crate) fn soft_delete(
        &mut self,
        key: &str,
        name: &str,
        visibility: Option<&Visibility>,
        timestamp: Timestamp,
    ) -> Vec<SlotKey> {
        let mut deleted = Vec::new();
        for (slot, state) in self.slots.iter_mut() {
            if slot.key != key || slot.name != name {
                continue;
            }
            if visibility.map_or(false, |v| v != &slot.visibility) {
                continue;
            }
            if state.live {
                state.live = false;
                state.timestamp = timestamp;
                deleted.push(slot.clone());
            }
        }
        deleted
    }

    /// Moves a live slot to `new_visibility`. Returns `false` when the old slot
    /// was not live.
    pub(crate) fn alter_visibility(
        &mut self,
        key: &str,
        name: &str,
        old_visibility: &Visibility,
        new_visibility: &Visibility,
        timestamp: Timestamp,
    ) -> bool {
        let old = SlotKey::new(key, name, old_visibility);
        let (value, metadata) = match self.slots.get_mut(&old) {
            Some(state) if state.live => {
                state.live = false;
                state.timestamp = timestamp;
                (state.value.clone(), state.metadata.clone())
            }
            _ => return false,
        };
        let new = SlotKey::new(key, name, new_visibility);
        // A value written to the new slot in the same batch wins over the carried one.
        let written_now = self
            .slots
            .get(&new)
            .map_or(false, |state| state.live && state.timestamp == timestamp);
        if !written_now {
            self.add(new, &value, &metadata, timestamp);
        }
        true
    }

    /// Overwrites one metadata entry of an existing slot; unknown slots are ignored.
    pub(crate) fn set_metadata(
        &mut self,
        slot: &SlotKey,
        metadata_key: &str,
        metadata_value: &PropertyValue,
        metadata_visibility: &Visibility,
    ) -> bool {
        match self.slots.get_mut(slot) {
            Some(state) => {
                state
                    .metadata
                    .set(metadata_key, metadata_value.clone(), metadata_visibility.clone());
                true
            }
            None => false,
        }
    }

    /// Records a hide/unhide mark on a slot, creating a placeholder so marks
    /// written before the value still apply once it arrives.
    pub(crate) fn mark_hidden(&mut self, slot: SlotKey, hide_visibility: &Visibility, hidden: bool) {
        let state = self.slots.entry(slot).or_insert_with(|| SlotState {
            value: PropertyValue::Null,
            metadata: Metadata::new(),
            timestamp: Timestamp::default(),
            live: false,
            hidden: HiddenMarks::default(),
        });
        state.hidden.mark(hide_visibility, hidden);
    }

    pub(crate) fn get(&self, slot: &SlotKey) -> Option<&SlotState> {
        self.slots.get(slot)
    }

    /// Live slots readable by `auths`, in slot order.
    pub(crate) fn readable<'a>(
        &'a self,
        auths: &'a Authorizations,
    ) -> impl Iterator<Item = (&'a SlotKey, &'a SlotState)> + 'a {
        self.slots
            .iter()
            .filter(move |(slot, state)| state.live && auths.can_read(&slot.visibility))
    }
}
