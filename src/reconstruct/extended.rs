#![forbid(unsafe_code)]

use crate::model::{ExtendedDataMutation, ExtendedDataRow, ExtendedDataRowView, ExtendedDataValue, Metadata};
use crate::security::Authorizations;
use crate::types::Timestamp;

use super::slots::{SlotKey, SlotTable};

/// Folds one extended-data row for `auths` as of `as_of`.
///
/// Columns follow the property slot rules with `(column, key, visibility)` in
/// place of `(key, name, visibility)`. Returns `None` when the row has no
/// column the caller may see, including rows deleted with `SoftDeleteRow`.
/// Owner existence is checked by the caller.
pub fn reconstruct_row(
    row: &ExtendedDataRow,
    auths: &Authorizations,
    as_of: Timestamp,
    include_hidden: bool,
) -> Option<ExtendedDataRowView> {
    let ordered = row.log.ordered_as_of(as_of);
    let live_start = ordered
        .iter()
        .rposition(|entry| matches!(entry.mutation, ExtendedDataMutation::SoftDeleteRow))
        .map_or(0, |idx| idx + 1);

    let no_metadata = Metadata::new();
    let mut slots = SlotTable::default();
    let mut timestamp = Timestamp::default();
    for entry in &ordered[live_start..] {
        let ts = entry.timestamp;
        timestamp = timestamp.max(ts);
        match &entry.mutation {
            ExtendedDataMutation::AddColumn {
                column,
                key,
                value,
                visibility,
            } => slots.add(SlotKey::new(column, key, visibility), value, &no_metadata, ts),
            ExtendedDataMutation::DeleteColumn {
                column,
                key,
                visibility,
            } => {
                slots.soft_delete(column, key, visibility.as_ref(), ts);
            }
            ExtendedDataMutation::AlterColumnVisibility {
                column,
                key,
                old_visibility,
                new_visibility,
            } => {
                slots.alter_visibility(column, key, old_visibility, new_visibility, ts);
            }
            ExtendedDataMutation::MarkColumnHidden {
                column,
                key,
                column_visibility,
                hide_visibility,
            } => slots.mark_hidden(SlotKey::new(column, key, column_visibility), hide_visibility, true),
            ExtendedDataMutation::MarkColumnVisible {
                column,
                key,
                column_visibility,
                hide_visibility,
            } => slots.mark_hidden(
                SlotKey::new(column, key, column_visibility),
                hide_visibility,
                false,
            ),
            ExtendedDataMutation::SoftDeleteRow => {}
        }
    }

    let values: Vec<ExtendedDataValue> = slots
        .readable(auths)
        .filter_map(|(slot, state)| {
            let hidden = state.hidden.is_hidden_for(auths);
            if hidden && !include_hidden {
                return None;
            }
            Some(ExtendedDataValue {
                column: slot.key.clone(),
                key: slot.name.clone(),
                value: state.value.clone(),
                visibility: slot.visibility.clone(),
                timestamp: state.timestamp,
                hidden,
            })
        })
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(ExtendedDataRowView {
        id: row.id.clone(),
        timestamp,
        values,
    })
}
