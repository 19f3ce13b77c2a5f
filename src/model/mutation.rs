#![forbid(unsafe_code)]

use crate::security::Visibility;
use crate::types::{Direction, ElementId};
use crate::value::PropertyValue;

use super::metadata::Metadata;

/// One atomic change to one element.
///
/// Every attribute of an element (existence, visibility, hidden state,
/// properties, edge label, edge references) is derived by folding these in
/// timestamp order; nothing is stored outside the log.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    /// Creates (or re-creates after a soft delete) the element.
    CreateElement {
        /// Element visibility.
        visibility: Visibility,
    },
    /// Writes a property value into the `(key, name, visibility)` slot.
    AddProperty {
        /// Property key, distinguishing multi-valued properties of one name.
        key: String,
        /// Property name.
        name: String,
        /// Value.
        value: PropertyValue,
        /// Metadata attached to the value.
        metadata: Metadata,
        /// Slot visibility.
        visibility: Visibility,
    },
    /// Soft deletes one slot, or every visibility of `(key, name)` when
    /// `visibility` is `None`.
    SoftDeleteProperty {
        /// Property key.
        key: String,
        /// Property name.
        name: String,
        /// Slot visibility; `None` means all.
        visibility: Option<Visibility>,
    },
    /// Moves a slot to a new visibility, carrying its value and metadata.
    AlterPropertyVisibility {
        /// Property key.
        key: String,
        /// Property name.
        name: String,
        /// Current slot visibility.
        old_visibility: Visibility,
        /// Target slot visibility.
        new_visibility: Visibility,
    },
    /// Overwrites one metadata entry of a slot.
    SetPropertyMetadata {
        /// Property key.
        key: String,
        /// Property name.
        name: String,
        /// Slot visibility.
        property_visibility: Visibility,
        /// Metadata key.
        metadata_key: String,
        /// Metadata value.
        metadata_value: PropertyValue,
        /// Metadata entry visibility.
        metadata_visibility: Visibility,
    },
    /// Hides a slot from readers of `hide_visibility`.
    MarkPropertyHidden {
        /// Property key.
        key: String,
        /// Property name.
        name: String,
        /// Slot visibility.
        property_visibility: Visibility,
        /// Who the slot is hidden from.
        hide_visibility: Visibility,
    },
    /// Reverses [`Mutation::MarkPropertyHidden`] for the same `hide_visibility`.
    MarkPropertyVisible {
        /// Property key.
        key: String,
        /// Property name.
        name: String,
        /// Slot visibility.
        property_visibility: Visibility,
        /// Hide visibility being cleared.
        hide_visibility: Visibility,
    },
    /// Terminal delete; only a later `CreateElement` brings the element back.
    SoftDeleteElement,
    /// Hides the element from readers of `hide_visibility`.
    MarkElementHidden {
        /// Who the element is hidden from.
        hide_visibility: Visibility,
    },
    /// Reverses [`Mutation::MarkElementHidden`] for the same `hide_visibility`.
    MarkElementVisible {
        /// Hide visibility being cleared.
        hide_visibility: Visibility,
    },
    /// Replaces the element visibility.
    AlterElementVisibility {
        /// New element visibility.
        new_visibility: Visibility,
    },
    /// Fixes an edge's endpoints and initial label. Edge only.
    EdgeSetup {
        /// Tail vertex.
        out_vertex_id: ElementId,
        /// Head vertex.
        in_vertex_id: ElementId,
        /// Initial label.
        label: String,
    },
    /// Relabels an edge. Edge only.
    AlterEdgeLabel {
        /// New label.
        new_label: String,
    },
    /// Records an incident edge on a vertex. Vertex only.
    AddEdgeRef {
        /// Incident edge.
        edge_id: ElementId,
        /// Direction of the edge relative to this vertex.
        direction: Direction,
        /// Vertex at the other end.
        other_vertex_id: ElementId,
        /// Edge label at the time the reference was written.
        label: String,
    },
}

impl Mutation {
    /// Short name used in logs and events.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Mutation::CreateElement { .. } => "create_element",
            Mutation::AddProperty { .. } => "add_property",
            Mutation::SoftDeleteProperty { .. } => "soft_delete_property",
            Mutation::AlterPropertyVisibility { .. } => "alter_property_visibility",
            Mutation::SetPropertyMetadata { .. } => "set_property_metadata",
            Mutation::MarkPropertyHidden { .. } => "mark_property_hidden",
            Mutation::MarkPropertyVisible { .. } => "mark_property_visible",
            Mutation::SoftDeleteElement => "soft_delete_element",
            Mutation::MarkElementHidden { .. } => "mark_element_hidden",
            Mutation::MarkElementVisible { .. } => "mark_element_visible",
            Mutation::AlterElementVisibility { .. } => "alter_element_visibility",
            Mutation::EdgeSetup { .. } => "edge_setup",
            Mutation::AlterEdgeLabel { .. } => "alter_edge_label",
            Mutation::AddEdgeRef { .. } => "add_edge_ref",
        }
    }

    /// Returns `true` for mutations only valid on edges.
    pub fn is_edge_only(&self) -> bool {
        matches!(
            self,
            Mutation::EdgeSetup { .. } | Mutation::AlterEdgeLabel { .. }
        )
    }

    /// Returns `true` for mutations only valid on vertices.
    pub fn is_vertex_only(&self) -> bool {
        matches!(self, Mutation::AddEdgeRef { .. })
    }

    /// Every visibility expression the mutation writes.
    pub fn visibilities(&self) -> Vec<&Visibility> {
        match self {
            Mutation::CreateElement { visibility } => vec![visibility],
            Mutation::AddProperty {
                metadata,
                visibility,
                ..
            } => {
                let mut out = vec![visibility];
                out.extend(metadata.entries().map(|entry| entry.visibility()));
                out
            }
            Mutation::SoftDeleteProperty { visibility, .. } => visibility.iter().collect(),
            Mutation::AlterPropertyVisibility {
                old_visibility,
                new_visibility,
                ..
            } => vec![old_visibility, new_visibility],
            Mutation::SetPropertyMetadata {
                property_visibility,
                metadata_visibility,
                ..
            } => vec![property_visibility, metadata_visibility],
            Mutation::MarkPropertyHidden {
                property_visibility,
                hide_visibility,
                ..
            }
            | Mutation::MarkPropertyVisible {
                property_visibility,
                hide_visibility,
                ..
            } => vec![property_visibility, hide_visibility],
            Mutation::MarkElementHidden { hide_visibility }
            | Mutation::MarkElementVisible { hide_visibility } => vec![hide_visibility],
            Mutation::AlterElementVisibility { new_visibility } => vec![new_visibility],
            Mutation::SoftDeleteElement
            | Mutation::EdgeSetup { .. }
            | Mutation::AlterEdgeLabel { .. }
            | Mutation::AddEdgeRef { .. } => Vec::new(),
        }
    }
}

/// One change to an extended-data row.
///
/// Columns are slots identified by `(column, key, visibility)` and follow the
/// same liveness, visibility and hiding rules as element properties.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtendedDataMutation {
    /// Writes a column value.
    AddColumn {
        /// Column name.
        column: String,
        /// Column key, distinguishing multi-valued columns.
        key: String,
        /// Value.
        value: PropertyValue,
        /// Column visibility.
        visibility: Visibility,
    },
    /// Soft deletes one column slot, or all its visibilities when `visibility` is `None`.
    DeleteColumn {
        /// Column name.
        column: String,
        /// Column key.
        key: String,
        /// Column visibility; `None` means all.
        visibility: Option<Visibility>,
    },
    /// Moves a column slot to a new visibility.
    AlterColumnVisibility {
        /// Column name.
        column: String,
        /// Column key.
        key: String,
        /// Current visibility.
        old_visibility: Visibility,
        /// Target visibility.
        new_visibility: Visibility,
    },
    /// Hides a column slot from readers of `hide_visibility`.
    MarkColumnHidden {
        /// Column name.
        column: String,
        /// Column key.
        key: String,
        /// Column visibility.
        column_visibility: Visibility,
        /// Who the column is hidden from.
        hide_visibility: Visibility,
    },
    /// Reverses [`ExtendedDataMutation::MarkColumnHidden`].
    MarkColumnVisible {
        /// Column name.
        column: String,
        /// Column key.
        key: String,
        /// Column visibility.
        column_visibility: Visibility,
        /// Hide visibility being cleared.
        hide_visibility: Visibility,
    },
    /// Deletes the whole row; later column writes start a fresh row.
    SoftDeleteRow,
}

impl ExtendedDataMutation {
    /// Short name used in logs and events.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExtendedDataMutation::AddColumn { .. } => "add_column",
            ExtendedDataMutation::DeleteColumn { .. } => "delete_column",
            ExtendedDataMutation::AlterColumnVisibility { .. } => "alter_column_visibility",
            ExtendedDataMutation::MarkColumnHidden { .. } => "mark_column_hidden",
            ExtendedDataMutation::MarkColumnVisible { .. } => "mark_column_visible",
            ExtendedDataMutation::SoftDeleteRow => "soft_delete_row",
        }
    }

    /// Every visibility expression the mutation writes.
    pub fn visibilities(&self) -> Vec<&Visibility> {
        match self {
            ExtendedDataMutation::AddColumn { visibility, .. } => vec![visibility],
            ExtendedDataMutation::DeleteColumn { visibility, .. } => visibility.iter().collect(),
            ExtendedDataMutation::AlterColumnVisibility {
                old_visibility,
                new_visibility,
                ..
            } => vec![old_visibility, new_visibility],
            ExtendedDataMutation::MarkColumnHidden {
                column_visibility,
                hide_visibility,
                ..
            }
            | ExtendedDataMutation::MarkColumnVisible {
                column_visibility,
                hide_visibility,
                ..
            } => vec![column_visibility, hide_visibility],
            ExtendedDataMutation::SoftDeleteRow => Vec::new(),
        }
    }
}
