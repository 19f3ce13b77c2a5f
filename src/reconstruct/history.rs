#![forbid(unsafe_code)]

use rustc_hash::FxHashSet;

use crate::model::{HistoricalPropertyValue, HistoryQuery, MetadataSelection, Mutation, MutationLog};
use crate::security::Authorizations;
use crate::types::Timestamp;

use super::slots::{SlotKey, SlotTable};

/// Replays `log` and records one entry per slot transition, newest first.
///
/// Adds produce live entries; property soft deletes, element soft deletes
/// and the old side of a visibility change produce `deleted` entries
/// carrying the last value.
/// Metadata updates and hide marks are not transitions.
pub(super) fn historical_values(
    log: &MutationLog,
    query: &HistoryQuery,
    auths: &Authorizations,
) -> Vec<HistoricalPropertyValue> {
    let ordered = log.ordered();
    // Slots explicitly written at a given time; a visibility change at the
    // same instant does not add a second entry for them.
    let explicit_adds: FxHashSet<(SlotKey, Timestamp)> = ordered
        .iter()
        .filter_map(|entry| match &entry.mutation {
            Mutation::AddProperty {
                key,
                name,
                visibility,
                ..
            } => Some((SlotKey::new(key, name, visibility), entry.timestamp)),
            _ => None,
        })
        .collect();

    let mut slots = SlotTable::default();
    let mut out = Vec::new();
    let mut record = |slots: &SlotTable, slot: &SlotKey, timestamp: Timestamp, deleted: bool| {
        if !query.matches_slot(&slot.key, &slot.name, &slot.visibility)
            || !query.matches_time(timestamp)
            || !auths.can_read(&slot.visibility)
        {
            return;
        }
        let Some(state) = slots.get(slot) else {
            return;
        };
        out.push(HistoricalPropertyValue {
            key: slot.key.clone(),
            name: slot.name.clone(),
            value: state.value.clone(),
            metadata: state.metadata.filtered(auths, &MetadataSelection::All),
            visibility: slot.visibility.clone(),
            timestamp,
            deleted,
        });
    };

    for entry in ordered {
        let ts = entry.timestamp;
        match &entry.mutation {
            Mutation::AddProperty {
                key,
                name,
                value,
                metadata,
                visibility,
            } => {
                let slot = SlotKey::new(key, name, visibility);
                slots.add(slot.clone(), value, metadata, ts);
                record(&slots, &slot, ts, false);
            }
            Mutation::SoftDeleteProperty {
                key,
                name,
                visibility,
            } => {
                for slot in slots.soft_delete(key, name, visibility.as_ref(), ts) {
                    record(&slots, &slot, ts, true);
                }
            }
            Mutation::AlterPropertyVisibility {
                key,
                name,
                old_visibility,
                new_visibility,
            } => {
                if slots.alter_visibility(key, name, old_visibility, new_visibility, ts) {
                    record(&slots, &SlotKey::new(key, name, old_visibility), ts, true);
                    let new = SlotKey::new(key, name, new_visibility);
                    if !explicit_adds.contains(&(new.clone(), ts)) {
                        record(&slots, &new, ts, false);
                    }
                }
            }
            Mutation::SetPropertyMetadata {
                key,
                name,
                property_visibility,
                metadata_key,
                metadata_value,
                metadata_visibility,
            } => {
                let slot = SlotKey::new(key, name, property_visibility);
                slots.set_metadata(&slot, metadata_key, metadata_value, metadata_visibility);
            }
            Mutation::SoftDeleteElement => {
                let live: Vec<SlotKey> = slots
                    .readable(auths)
                    .map(|(slot, _)| slot.clone())
                    .collect();
                for slot in &live {
                    record(&slots, slot, ts, true);
                }
                slots = SlotTable::default();
            }
            Mutation::CreateElement { .. }
            | Mutation::MarkPropertyHidden { .. }
            | Mutation::MarkPropertyVisible { .. }
            | Mutation::MarkElementHidden { .. }
            | Mutation::MarkElementVisible { .. }
            | Mutation::AlterElementVisibility { .. }
            | Mutation::EdgeSetup { .. }
            | Mutation::AlterEdgeLabel { .. }
            | Mutation::AddEdgeRef { .. } => {}
        }
    }
    out.reverse();
    out
}
