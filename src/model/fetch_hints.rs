#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use crate::types::Direction;

/// Which properties to materialize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertySelection {
    /// No properties; accessing them is a fetch hints violation.
    None,
    /// Every property.
    All,
    /// Only properties with these names.
    Names(BTreeSet<String>),
}

impl PropertySelection {
    /// Returns `true` when properties named `name` are materialized.
    pub fn includes(&self, name: &str) -> bool {
        match self {
            PropertySelection::None => false,
            PropertySelection::All => true,
            PropertySelection::Names(names) => names.contains(name),
        }
    }
}

/// Which property metadata keys to materialize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataSelection {
    /// No metadata.
    None,
    /// Every metadata key.
    All,
    /// Only these metadata keys.
    Keys(BTreeSet<String>),
}

impl MetadataSelection {
    /// Returns `true` when metadata entries keyed `key` are materialized.
    pub fn includes(&self, key: &str) -> bool {
        match self {
            MetadataSelection::None => false,
            MetadataSelection::All => true,
            MetadataSelection::Keys(keys) => keys.contains(key),
        }
    }
}

/// Which vertex edge references to materialize.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeRefSelection {
    /// No edge references.
    None,
    /// Incoming edges only.
    InOnly,
    /// Outgoing edges only.
    OutOnly,
    /// Incoming and outgoing edges.
    Both,
    /// Every edge reference.
    All,
}

/// Which extended-data tables to list on an element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableSelection {
    /// No tables.
    None,
    /// Every table.
    All,
    /// Only these table names.
    Names(BTreeSet<String>),
}

impl TableSelection {
    /// Returns `true` when `table` is selected.
    pub fn includes(&self, table: &str) -> bool {
        match self {
            TableSelection::None => false,
            TableSelection::All => true,
            TableSelection::Names(names) => names.contains(table),
        }
    }
}

/// Request-scoped description of which parts of an element to materialize.
///
/// Reading a part the hints left out fails with
/// [`crate::GraphError::FetchHintsViolation`] instead of returning an empty
/// result, so a caller asking for a cheap partial load cannot silently depend
/// on the omitted data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchHints {
    /// Return hidden elements and properties (flagged as hidden).
    pub include_hidden: bool,
    /// Property selection.
    pub properties: PropertySelection,
    /// Property metadata selection.
    pub property_metadata: MetadataSelection,
    /// Vertex edge reference selection.
    pub edge_refs: EdgeRefSelection,
    /// Materialize edge labels and counts but not edge or vertex ids.
    pub edge_labels_and_counts_only: bool,
    /// Extended data tables to list.
    pub extended_data_tables: TableSelection,
}

impl Default for FetchHints {
    fn default() -> Self {
        Self {
            include_hidden: false,
            properties: PropertySelection::All,
            property_metadata: MetadataSelection::All,
            edge_refs: EdgeRefSelection::Both,
            edge_labels_and_counts_only: false,
            extended_data_tables: TableSelection::All,
        }
    }
}

impl FetchHints {
    /// Everything except hidden data.
    pub fn all() -> Self {
        Self::default()
    }

    /// Everything, hidden data included.
    pub fn all_including_hidden() -> Self {
        Self {
            include_hidden: true,
            ..Self::default()
        }
    }

    /// Identity, visibility and hidden state only.
    pub fn none() -> Self {
        Self {
            include_hidden: false,
            properties: PropertySelection::None,
            property_metadata: MetadataSelection::None,
            edge_refs: EdgeRefSelection::None,
            edge_labels_and_counts_only: false,
            extended_data_tables: TableSelection::None,
        }
    }

    /// Starts a builder from [`FetchHints::none`].
    pub fn builder() -> FetchHintsBuilder {
        FetchHintsBuilder {
            hints: Self::none(),
        }
    }

    /// Returns `true` when any property can be materialized.
    pub fn has_properties(&self) -> bool {
        self.properties != PropertySelection::None
    }

    /// Returns `true` when properties named `name` are materialized.
    pub fn includes_property(&self, name: &str) -> bool {
        self.properties.includes(name)
    }

    /// Returns `true` when any metadata can be materialized.
    pub fn has_metadata(&self) -> bool {
        self.property_metadata != MetadataSelection::None
    }

    /// Returns `true` when any edge information must be loaded for a vertex.
    pub fn loads_edges(&self) -> bool {
        self.edge_refs != EdgeRefSelection::None || self.edge_labels_and_counts_only
    }

    /// Returns `true` when full edge references in `direction` are materialized.
    pub fn allows_edge_refs(&self, direction: Direction) -> bool {
        if self.edge_labels_and_counts_only {
            return false;
        }
        self.edge_refs_cover(direction)
    }

    /// Returns `true` when edge labels and counts in `direction` are available.
    pub fn allows_edge_counts(&self, direction: Direction) -> bool {
        self.edge_labels_and_counts_only || self.edge_refs_cover(direction)
    }

    fn edge_refs_cover(&self, direction: Direction) -> bool {
        match (self.edge_refs, direction) {
            (EdgeRefSelection::None, _) => false,
            (EdgeRefSelection::Both | EdgeRefSelection::All, _) => true,
            (EdgeRefSelection::InOnly, Direction::In) => true,
            (EdgeRefSelection::OutOnly, Direction::Out) => true,
            _ => false,
        }
    }
}

/// Builder for [`FetchHints`], starting with nothing selected.
#[derive(Clone, Debug)]
pub struct FetchHintsBuilder {
    hints: FetchHints,
}

impl FetchHintsBuilder {
    /// Sets whether hidden data is returned.
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.hints.include_hidden = include;
        self
    }

    /// Selects every property.
    pub fn all_properties(mut self) -> Self {
        self.hints.properties = PropertySelection::All;
        self
    }

    /// Adds property names to the selection.
    pub fn property_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selected =
            match std::mem::replace(&mut self.hints.properties, PropertySelection::None) {
                PropertySelection::Names(existing) => existing,
                _ => BTreeSet::new(),
            };
        selected.extend(names.into_iter().map(Into::into));
        self.hints.properties = PropertySelection::Names(selected);
        self
    }

    /// Selects all metadata.
    pub fn all_metadata(mut self) -> Self {
        self.hints.property_metadata = MetadataSelection::All;
        self
    }

    /// Adds metadata keys to the selection.
    pub fn metadata_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selected =
            match std::mem::replace(&mut self.hints.property_metadata, MetadataSelection::None) {
                MetadataSelection::Keys(existing) => existing,
                _ => BTreeSet::new(),
            };
        selected.extend(keys.into_iter().map(Into::into));
        self.hints.property_metadata = MetadataSelection::Keys(selected);
        self
    }

    /// Sets the edge reference selection.
    pub fn edge_refs(mut self, selection: EdgeRefSelection) -> Self {
        self.hints.edge_refs = selection;
        self
    }

    /// Requests edge labels and counts without ids.
    pub fn edge_labels_and_counts_only(mut self, enabled: bool) -> Self {
        self.hints.edge_labels_and_counts_only = enabled;
        self
    }

    /// Sets the extended data table selection.
    pub fn extended_data_tables(mut self, selection: TableSelection) -> Self {
        self.hints.extended_data_tables = selection;
        self
    }

    /// Finishes the builder.
    pub fn build(self) -> FetchHints {
        self.hints
    }
}
