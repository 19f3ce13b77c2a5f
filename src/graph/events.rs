#![forbid(unsafe_code)]

use crate::model::{ExtendedDataMutation, ExtendedDataRowId, Mutation};
use crate::security::Visibility;
use crate::types::{ElementId, ElementType, Timestamp};

/// One logical change, reported after its batch was durably appended.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
    /// A vertex was created or resurrected.
    AddVertex {
        /// Vertex id.
        id: ElementId,
        /// Batch timestamp.
        timestamp: Timestamp,
    },
    /// An edge was created or resurrected.
    AddEdge {
        /// Edge id.
        id: ElementId,
        /// Tail vertex.
        out_vertex_id: ElementId,
        /// Head vertex.
        in_vertex_id: ElementId,
        /// Edge label.
        label: String,
        /// Batch timestamp.
        timestamp: Timestamp,
    },
    /// A vertex or edge was soft deleted.
    DeleteElement {
        /// Namespace.
        element_type: ElementType,
        /// Element id.
        id: ElementId,
        /// Batch timestamp.
        timestamp: Timestamp,
    },
    /// The element visibility changed.
    AlterElementVisibility {
        /// Namespace.
        element_type: ElementType,
        /// Element id.
        id: ElementId,
        /// New visibility.
        visibility: Visibility,
        /// Batch timestamp.
        timestamp: Timestamp,
    },
    /// The element was hidden from readers of `hide_visibility`.
    MarkElementHidden {
        /// Namespace.
        element_type: ElementType,
        /// Element id.
        id: ElementId,
        /// Hide visibility.
        hide_visibility: Visibility,
        /// Batch timestamp.
        timestamp: Timestamp,
    },
    /// A hide mark on the element was cleared.
    MarkElementVisible {
        /// Namespace.
        element_type: ElementType,
        /// Element id.
        id: ElementId,
        /// Hide visibility.
        hide_visibility: Visibility,
        /// Batch timestamp.
        timestamp: Timestamp,
    },
    /// A property value was written.
    AddProperty {
        /// Namespace.
        element_type: ElementType,
        /// Element id.
        id: ElementId,
        /// Property key.
        key: String,
        /// Property name.
        name: String,
        /// Property visibility.
        visibility: Visibility,
        /// Write timestamp.
        timestamp: Timestamp,
    },
    /// A property was soft deleted.
    DeleteProperty {
        /// Namespace.
        element_type: ElementType,
        /// Element id.
        id: ElementId,
        /// Property key.
        key: String,
        /// Property name.
        name: String,
        /// Deleted visibility; `None` means all.
        visibility: Option<Visibility>,
        /// Write timestamp.
        timestamp: Timestamp,
    },
    /// A property moved to a new visibility.
    AlterPropertyVisibility {
        /// Namespace.
        element_type: ElementType,
        /// Element id.
        id: ElementId,
        /// Property key.
        key: String,
        /// Property name.
        name: String,
        /// Previous visibility.
        old_visibility: Visibility,
        /// New visibility.
        new_visibility: Visibility,
        /// Write timestamp.
        timestamp: Timestamp,
    },
    /// A property metadata entry was written.
    SetPropertyMetadata {
        /// Namespace.
        element_type: ElementType,
        /// Element id.
        id: ElementId,
        /// Property key.
        key: String,
        /// Property name.
        name: String,
        /// Metadata key.
        metadata_key: String,
        /// Write timestamp.
        timestamp: Timestamp,
    },
    /// A property hide mark changed.
    AlterPropertyHidden {
        /// Namespace.
        element_type: ElementType,
        /// Element id.
        id: ElementId,
        /// Property key.
        key: String,
        /// Property name.
        name: String,
        /// Hide visibility.
        hide_visibility: Visibility,
        /// `true` for hidden, `false` when the mark was cleared.
        hidden: bool,
        /// Write timestamp.
        timestamp: Timestamp,
    },
    /// An edge was relabelled.
    AlterEdgeLabel {
        /// Edge id.
        id: ElementId,
        /// New label.
        label: String,
        /// Batch timestamp.
        timestamp: Timestamp,
    },
    /// An extended-data column was written.
    AddExtendedData {
        /// Row.
        row: ExtendedDataRowId,
        /// Column name.
        column: String,
        /// Column key.
        key: String,
        /// Write timestamp.
        timestamp: Timestamp,
    },
    /// An extended-data column was soft deleted.
    DeleteExtendedData {
        /// Row.
        row: ExtendedDataRowId,
        /// Column name.
        column: String,
        /// Column key.
        key: String,
        /// Write timestamp.
        timestamp: Timestamp,
    },
    /// An extended-data column changed visibility or hidden state.
    AlterExtendedData {
        /// Row.
        row: ExtendedDataRowId,
        /// Column name.
        column: String,
        /// Column key.
        key: String,
        /// Mutation kind, e.g. `mark_column_hidden`.
        change: &'static str,
        /// Write timestamp.
        timestamp: Timestamp,
    },
    /// An extended-data row was soft deleted.
    DeleteExtendedDataRow {
        /// Row.
        row: ExtendedDataRowId,
        /// Write timestamp.
        timestamp: Timestamp,
    },
}

impl GraphEvent {
    /// Timestamp of the change.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            GraphEvent::AddVertex { timestamp, .. }
            | GraphEvent::AddEdge { timestamp, .. }
            | GraphEvent::DeleteElement { timestamp, .. }
            | GraphEvent::AlterElementVisibility { timestamp, .. }
            | GraphEvent::MarkElementHidden { timestamp, .. }
            | GraphEvent::MarkElementVisible { timestamp, .. }
            | GraphEvent::AddProperty { timestamp, .. }
            | GraphEvent::DeleteProperty { timestamp, .. }
            | GraphEvent::AlterPropertyVisibility { timestamp, .. }
            | GraphEvent::SetPropertyMetadata { timestamp, .. }
            | GraphEvent::AlterPropertyHidden { timestamp, .. }
            | GraphEvent::AlterEdgeLabel { timestamp, .. }
            | GraphEvent::AddExtendedData { timestamp, .. }
            | GraphEvent::DeleteExtendedData { timestamp, .. }
            | GraphEvent::AlterExtendedData { timestamp, .. }
            | GraphEvent::DeleteExtendedDataRow { timestamp, .. } => *timestamp,
        }
    }
}

/// Receives [`GraphEvent`]s from [`super::Graph`].
///
/// Listeners run synchronously on the saving thread, after the batch is
/// durable; they must not call back into the graph's save path.
pub trait GraphEventListener: Send + Sync {
    /// Called once per logical change.
    fn on_graph_event(&self, event: &GraphEvent);
}

/// Event for one appended element mutation; creation and edge references are
/// reported by the save path itself.
pub(crate) fn element_event(
    element_type: ElementType,
    id: &ElementId,
    mutation: &Mutation,
    timestamp: Timestamp,
) -> Option<GraphEvent> {
    let id = id.clone();
    let event = match mutation {
        Mutation::AddProperty {
            key,
            name,
            visibility,
            ..
        } => GraphEvent::AddProperty {
            element_type,
            id,
            key: key.clone(),
            name: name.clone(),
            visibility: visibility.clone(),
            timestamp,
        },
        Mutation::SoftDeleteProperty {
            key,
            name,
            visibility,
        } => GraphEvent::DeleteProperty {
            element_type,
            id,
            key: key.clone(),
            name: name.clone(),
            visibility: visibility.clone(),
            timestamp,
        },
        Mutation::AlterPropertyVisibility {
            key,
            name,
            old_visibility,
            new_visibility,
        } => GraphEvent::AlterPropertyVisibility {
            element_type,
            id,
            key: key.clone(),
            name: name.clone(),
            old_visibility: old_visibility.clone(),
            new_visibility: new_visibility.clone(),
            timestamp,
        },
        Mutation::SetPropertyMetadata {
            key,
            name,
            metadata_key,
            ..
        } => GraphEvent::SetPropertyMetadata {
            element_type,
            id,
            key: key.clone(),
            name: name.clone(),
            metadata_key: metadata_key.clone(),
            timestamp,
        },
        Mutation::MarkPropertyHidden {
            key,
            name,
            hide_visibility,
            ..
        } => GraphEvent::AlterPropertyHidden {
            element_type,
            id,
            key: key.clone(),
            name: name.clone(),
            hide_visibility: hide_visibility.clone(),
            hidden: true,
            timestamp,
        },
        Mutation::MarkPropertyVisible {
            key,
            name,
            hide_visibility,
            ..
        } => GraphEvent::AlterPropertyHidden {
            element_type,
            id,
            key: key.clone(),
            name: name.clone(),
            hide_visibility: hide_visibility.clone(),
            hidden: false,
            timestamp,
        },
        Mutation::SoftDeleteElement => GraphEvent::DeleteElement {
            element_type,
            id,
            timestamp,
        },
        Mutation::MarkElementHidden { hide_visibility } => GraphEvent::MarkElementHidden {
            element_type,
            id,
            hide_visibility: hide_visibility.clone(),
            timestamp,
        },
        Mutation::MarkElementVisible { hide_visibility } => GraphEvent::MarkElementVisible {
            element_type,
            id,
            hide_visibility: hide_visibility.clone(),
            timestamp,
        },
        Mutation::AlterElementVisibility { new_visibility } => GraphEvent::AlterElementVisibility {
            element_type,
            id,
            visibility: new_visibility.clone(),
            timestamp,
        },
        Mutation::AlterEdgeLabel { new_label } => GraphEvent::AlterEdgeLabel {
            id,
            label: new_label.clone(),
            timestamp,
        },
        Mutation::CreateElement { .. } | Mutation::EdgeSetup { .. } | Mutation::AddEdgeRef { .. } => {
            return None
        }
    };
    Some(event)
}

/// Event for one appended extended-data mutation.
pub(crate) fn extended_event(
    row: &ExtendedDataRowId,
    mutation: &ExtendedDataMutation,
    timestamp: Timestamp,
) -> GraphEvent {
    let row = row.clone();
    match mutation {
        ExtendedDataMutation::AddColumn { column, key, .. } => GraphEvent::AddExtendedData {
            row,
            column: column.clone(),
            key: key.clone(),
            timestamp,
        },
        ExtendedDataMutation::DeleteColumn { column, key, .. } => GraphEvent::DeleteExtendedData {
            row,
            column: column.clone(),
            key: key.clone(),
            timestamp,
        },
        ExtendedDataMutation::AlterColumnVisibility { column, key, .. }
        | ExtendedDataMutation::MarkColumnHidden { column, key, .. }
        | ExtendedDataMutation::MarkColumnVisible { column, key, .. } => {
            GraphEvent::AlterExtendedData {
                row,
                column: column.clone(),
                key: key.clone(),
                change: mutation.kind_name(),
                timestamp,
            }
        }
        ExtendedDataMutation::SoftDeleteRow => GraphEvent::DeleteExtendedDataRow { row, timestamp },
    }
}
