//! Storage adapter boundary.
//!
//! The reconstruction core never touches a backend directly. Everything it
//! persists or loads goes through the narrow [`StorageAdapter`] contract, which
//! a backend implements without subclassing any core type.

use std::io::Read;

use bytes::Bytes;

use crate::error::Result;
use crate::model::{ExtendedDataMutation, ExtendedDataRow, ExtendedDataRowId, LogEntry, Mutation, MutationLog};
use crate::streaming::ResolutionKey;
use crate::types::{ElementId, ElementType};
use crate::value::PropertyValue;

/// CRC32 helpers shared by log frames and streaming payloads.
pub mod checksum;

/// Binary frame encoding of mutation batches.
pub mod codec;

/// In-memory reference adapter.
pub mod memory;

mod metrics;

/// Metrics hooks.
pub use metrics::{default_metrics, CounterMetrics, GraphMetrics, NoopMetrics};

pub use memory::InMemoryStorage;

/// Lexical id range used by scan-style reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdRange {
    /// Every id.
    All,
    /// Ids starting with the prefix.
    Prefix(String),
    /// Ids in `[start, end)`; an open bound is unbounded.
    Between {
        /// Inclusive lower bound.
        start: Option<ElementId>,
        /// Exclusive upper bound.
        end: Option<ElementId>,
    },
}

impl IdRange {
    /// Returns `true` when `id` falls in the range.
    pub fn contains(&self, id: &ElementId) -> bool {
        match self {
            IdRange::All => true,
            IdRange::Prefix(prefix) => id.has_prefix(prefix),
            IdRange::Between { start, end } => {
                start.as_ref().map_or(true, |start| id >= start)
                    && end.as_ref().map_or(true, |end| id < end)
            }
        }
    }

    /// Smallest id the range can contain, used to seek ordered backends.
    pub fn lower_bound(&self) -> ElementId {
        match self {
            IdRange::All => ElementId::new(""),
            IdRange::Prefix(prefix) => ElementId::new(prefix.as_str()),
            IdRange::Between { start, .. } => start.clone().unwrap_or_else(|| ElementId::new("")),
        }
    }

    /// Returns `true` when no id at or after `id` can be in the range.
    pub fn is_past(&self, id: &ElementId) -> bool {
        match self {
            IdRange::All => false,
            IdRange::Prefix(prefix) => id.as_str() > prefix.as_str() && !id.has_prefix(prefix),
            IdRange::Between { end, .. } => end.as_ref().map_or(false, |end| id >= end),
        }
    }
}

/// Contract a backend implements to host a graph.
///
/// Appends to one element's log must be serialized by the adapter and applied
/// atomically per batch so that readers always observe a total order.
/// Reads return owned snapshots; reconstruction never holds adapter locks.
pub trait StorageAdapter: Send + Sync {
    /// Durably appends `batch` to the log of `(element_type, id)`.
    fn append_mutations(
        &self,
        element_type: ElementType,
        id: &ElementId,
        batch: &[LogEntry<Mutation>],
    ) -> Result<()>;

    /// Loads the full log of `(element_type, id)`.
    fn load_log(&self, element_type: ElementType, id: &ElementId) -> Result<Option<MutationLog>>;

    /// Loads logs of every element in `range`, ordered by id.
    fn scan_logs(
        &self,
        element_type: ElementType,
        range: &IdRange,
    ) -> Result<Vec<(ElementId, MutationLog)>>;

    /// Durably appends `batch` to an extended-data row.
    fn append_extended_data(
        &self,
        row: &ExtendedDataRowId,
        batch: &[LogEntry<ExtendedDataMutation>],
    ) -> Result<()>;

    /// Loads the rows attached to an element, optionally limited to one table.
    fn load_extended_data_rows(
        &self,
        element_type: ElementType,
        id: &ElementId,
        table: Option<&str>,
    ) -> Result<Vec<ExtendedDataRow>>;

    /// Stores a streaming payload under `key`.
    fn store_streaming_value(&self, key: &ResolutionKey, data: Bytes) -> Result<()>;

    /// Opens the payload stored under `key`.
    fn resolve_streaming_value(&self, key: &ResolutionKey) -> Result<Box<dyn Read + Send>>;

    /// Sets a graph-wide metadata value.
    fn set_graph_metadata(&self, key: &str, value: PropertyValue) -> Result<()>;

    /// Reads a graph-wide metadata value.
    fn get_graph_metadata(&self, key: &str) -> Result<Option<PropertyValue>>;
}
