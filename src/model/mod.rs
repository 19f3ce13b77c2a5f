//! Element data model.
//!
//! Elements own an append-only [`MutationLog`]; everything a reader sees
//! ([`Vertex`], [`Edge`], [`Property`], [`ExtendedDataRowView`]) is computed
//! from it by [`crate::reconstruct`].

/// Materialized vertex and edge views.
pub mod element;

/// Extended-data row identities and views.
pub mod extended;

/// Fetch hints.
pub mod fetch_hints;

/// Append-only mutation logs.
pub mod log;

/// Property metadata.
pub mod metadata;

/// Mutation variants.
pub mod mutation;

/// Materialized and historical property values.
pub mod property;

pub use element::{Edge, EdgeInfo, Element, ElementView, Vertex};
pub use extended::{ExtendedDataRow, ExtendedDataRowId, ExtendedDataRowView, ExtendedDataValue};
pub use fetch_hints::{
    EdgeRefSelection, FetchHints, FetchHintsBuilder, MetadataSelection, PropertySelection,
    TableSelection,
};
pub use log::{ExtendedDataLog, Log, LogEntry, MutationLog};
pub use metadata::{Metadata, MetadataEntry};
pub use mutation::{ExtendedDataMutation, Mutation};
pub use property::{HistoricalPropertyValue, HistoryQuery, Property};
