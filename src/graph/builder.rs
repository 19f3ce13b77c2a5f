#![forbid(unsafe_code)]

use crate::model::{ExtendedDataMutation, Metadata, Mutation};
use crate::security::Visibility;
use crate::streaming::StreamingPropertyValue;
use crate::types::{ElementId, ElementType, Timestamp};
use crate::value::PropertyValue;

/// How the element being mutated comes into existence.
#[derive(Clone, Debug)]
pub(crate) enum Origin {
    /// `prepare_vertex`: create, re-create or re-save the vertex.
    NewVertex { visibility: Visibility },
    /// `prepare_edge`: create, re-create or re-save the edge.
    NewEdge {
        visibility: Visibility,
        out_vertex_id: ElementId,
        in_vertex_id: ElementId,
        label: String,
    },
    /// `mutate_vertex` / `mutate_edge`: the element must already exist.
    Existing,
}

#[derive(Clone, Debug)]
pub(crate) enum PendingChange {
    Mutation(Mutation),
    Streaming {
        key: String,
        name: String,
        value: StreamingPropertyValue,
        metadata: Metadata,
        visibility: Visibility,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Pending {
    pub change: PendingChange,
    pub timestamp: Option<Timestamp>,
}

#[derive(Clone, Debug)]
pub(crate) struct PendingExtended {
    pub table: String,
    pub row: String,
    pub mutation: ExtendedDataMutation,
}

/// Batch of changes to one vertex or edge, applied by [`super::Graph::save`].
///
/// Every change in the batch shares one timestamp unless the batch was pinned
/// with [`ElementMutation::at`] or a property write carries its own.
#[derive(Clone, Debug)]
pub struct ElementMutation {
    pub(crate) element_type: ElementType,
    pub(crate) id: ElementId,
    pub(crate) origin: Origin,
    pub(crate) timestamp: Option<Timestamp>,
    pub(crate) changes: Vec<Pending>,
    pub(crate) extended: Vec<PendingExtended>,
}

impl ElementMutation {
    pub(crate) fn new(element_type: ElementType, id: ElementId, origin: Origin) -> Self {
        Self {
            element_type,
            id,
            origin,
            timestamp: None,
            changes: Vec::new(),
            extended: Vec::new(),
        }
    }

    /// Element id.
    pub fn id(&self) -> &ElementId {
        &self.id
    }

    /// Vertex or edge.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Returns `true` when nothing would be written.
    pub fn is_empty(&self) -> bool {
        matches!(self.origin, Origin::Existing) && self.changes.is_empty() && self.extended.is_empty()
    }

    /// Pins the batch timestamp instead of taking one from the graph clock.
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    fn push(mut self, mutation: Mutation) -> Self {
        self.changes.push(Pending {
            change: PendingChange::Mutation(mutation),
            timestamp: None,
        });
        self
    }

    /// Writes `(key, name, visibility)` with empty metadata.
    pub fn add_property(
        self,
        key: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
        visibility: Visibility,
    ) -> Self {
        self.add_property_with(key, name, value, Metadata::new(), visibility, None)
    }

    /// Writes a property with metadata and an optional explicit timestamp.
    pub fn add_property_with(
        mut self,
        key: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
        metadata: Metadata,
        visibility: Visibility,
        timestamp: Option<Timestamp>,
    ) -> Self {
        self.changes.push(Pending {
            change: PendingChange::Mutation(Mutation::AddProperty {
                key: key.into(),
                name: name.into(),
                value: value.into(),
                metadata,
                visibility,
            }),
            timestamp,
        });
        self
    }

    /// Writes a large value out of line; the log records only a reference.
    pub fn add_streaming_property(
        mut self,
        key: impl Into<String>,
        name: impl Into<String>,
        value: StreamingPropertyValue,
        visibility: Visibility,
    ) -> Self {
        self.changes.push(Pending {
            change: PendingChange::Streaming {
                key: key.into(),
                name: name.into(),
                value,
                metadata: Metadata::new(),
                visibility,
            },
            timestamp: None,
        });
        self
    }

    /// Soft deletes one visibility of a property, or all of them with `None`.
    pub fn soft_delete_property(
        self,
        key: impl Into<String>,
        name: impl Into<String>,
        visibility: Option<Visibility>,
    ) -> Self {
        self.push(Mutation::SoftDeleteProperty {
            key: key.into(),
            name: name.into(),
            visibility,
        })
    }

    /// Moves a property slot to a new visibility.
    pub fn alter_property_visibility(
        self,
        key: impl Into<String>,
        name: impl Into<String>,
        old_visibility: Visibility,
        new_visibility: Visibility,
    ) -> Self {
        self.push(Mutation::AlterPropertyVisibility {
            key: key.into(),
            name: name.into(),
            old_visibility,
            new_visibility,
        })
    }

    /// Writes one metadata entry on an existing property slot.
    pub fn set_property_metadata(
        self,
        key: impl Into<String>,
        name: impl Into<String>,
        property_visibility: Visibility,
        metadata_key: impl Into<String>,
        metadata_value: impl Into<PropertyValue>,
        metadata_visibility: Visibility,
    ) -> Self {
        self.push(Mutation::SetPropertyMetadata {
            key: key.into(),
            name: name.into(),
            property_visibility,
            metadata_key: metadata_key.into(),
            metadata_value: metadata_value.into(),
            metadata_visibility,
        })
    }

    /// Hides a property slot from readers of `hide_visibility`.
    pub fn mark_property_hidden(
        self,
        key: impl Into<String>,
        name: impl Into<String>,
        property_visibility: Visibility,
        hide_visibility: Visibility,
    ) -> Self {
        self.push(Mutation::MarkPropertyHidden {
            key: key.into(),
            name: name.into(),
            property_visibility,
            hide_visibility,
        })
    }

    /// Clears a property hide mark.
    pub fn mark_property_visible(
        self,
        key: impl Into<String>,
        name: impl Into<String>,
        property_visibility: Visibility,
        hide_visibility: Visibility,
    ) -> Self {
        self.push(Mutation::MarkPropertyVisible {
            key: key.into(),
            name: name.into(),
            property_visibility,
            hide_visibility,
        })
    }

    /// Hides the element from readers of `hide_visibility`.
    pub fn mark_hidden(self, hide_visibility: Visibility) -> Self {
        self.push(Mutation::MarkElementHidden { hide_visibility })
    }

    /// Clears an element hide mark.
    pub fn mark_visible(self, hide_visibility: Visibility) -> Self {
        self.push(Mutation::MarkElementVisible { hide_visibility })
    }

    /// Changes the element visibility.
    pub fn alter_element_visibility(self, new_visibility: Visibility) -> Self {
        self.push(Mutation::AlterElementVisibility { new_visibility })
    }

    /// Soft deletes the element. Deleting a vertex also deletes its edges.
    pub fn soft_delete(self) -> Self {
        self.push(Mutation::SoftDeleteElement)
    }

    /// Relabels an edge.
    pub fn alter_edge_label(self, new_label: impl Into<String>) -> Self {
        self.push(Mutation::AlterEdgeLabel {
            new_label: new_label.into(),
        })
    }

    fn push_extended(
        mut self,
        table: impl Into<String>,
        row: impl Into<String>,
        mutation: ExtendedDataMutation,
    ) -> Self {
        self.extended.push(PendingExtended {
            table: table.into(),
            row: row.into(),
            mutation,
        });
        self
    }

    /// Writes an extended-data column.
    pub fn add_extended_data(
        self,
        table: impl Into<String>,
        row: impl Into<String>,
        column: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
        visibility: Visibility,
    ) -> Self {
        self.push_extended(
            table,
            row,
            ExtendedDataMutation::AddColumn {
                column: column.into(),
                key: key.into(),
                value: value.into(),
                visibility,
            },
        )
    }

    /// Soft deletes an extended-data column slot.
    pub fn delete_extended_data(
        self,
        table: impl Into<String>,
        row: impl Into<String>,
        column: impl Into<String>,
        key: impl Into<String>,
        visibility: Option<Visibility>,
    ) -> Self {
        self.push_extended(
            table,
            row,
            ExtendedDataMutation::DeleteColumn {
                column: column.into(),
                key: key.into(),
                visibility,
            },
        )
    }

    /// Moves an extended-data column to a new visibility.
    pub fn alter_extended_data_visibility(
        self,
        table: impl Into<String>,
        row: impl Into<String>,
        column: impl Into<String>,
        key: impl Into<String>,
        old_visibility: Visibility,
        new_visibility: Visibility,
    ) -> Self {
        self.push_extended(
            table,
            row,
            ExtendedDataMutation::AlterColumnVisibility {
                column: column.into(),
                key: key.into(),
                old_visibility,
                new_visibility,
            },
        )
    }

    /// Hides or unhides an extended-data column for readers of `hide_visibility`.
    pub fn mark_extended_data_hidden(
        self,
        table: impl Into<String>,
        row: impl Into<String>,
        column: impl Into<String>,
        key: impl Into<String>,
        column_visibility: Visibility,
        hide_visibility: Visibility,
        hidden: bool,
    ) -> Self {
        let column = column.into();
        let key = key.into();
        let mutation = if hidden {
            ExtendedDataMutation::MarkColumnHidden {
                column,
                key,
                column_visibility,
                hide_visibility,
            }
        } else {
            ExtendedDataMutation::MarkColumnVisible {
                column,
                key,
                column_visibility,
                hide_visibility,
            }
        };
        self.push_extended(table, row, mutation)
    }

    /// Soft deletes a whole extended-data row.
    pub fn delete_extended_data_row(self, table: impl Into<String>, row: impl Into<String>) -> Self {
        self.push_extended(table, row, ExtendedDataMutation::SoftDeleteRow)
    }
}
