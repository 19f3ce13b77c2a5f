#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::{Result, StorageError};
use crate::model::{
    ExtendedDataLog, ExtendedDataMutation, ExtendedDataRow, ExtendedDataRowId, LogEntry, Mutation,
    MutationLog,
};
use crate::streaming::ResolutionKey;
use crate::types::{ElementId, ElementType};
use crate::value::PropertyValue;

use super::codec;
use super::{IdRange, StorageAdapter};

#[derive(Default)]
struct Inner {
    logs: BTreeMap<(ElementType, ElementId), Vec<Bytes>>,
    rows: BTreeMap<ExtendedDataRowId, Vec<Bytes>>,
    blobs: FxHashMap<ResolutionKey, Bytes>,
    metadata: BTreeMap<String, PropertyValue>,
}

/// [`StorageAdapter`] keeping encoded frames in memory.
///
/// Each appended batch is stored as one checksummed frame, so loads exercise
/// the same decode path a persistent backend would. A single writer lock
/// serializes appends.
#[derive(Default)]
pub struct InMemoryStorage {
    inner: RwLock<Inner>,
    resolves: AtomicU64,
}

impl InMemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of [`StorageAdapter::resolve_streaming_value`] calls served.
    pub fn streaming_resolve_count(&self) -> u64 {
        self.resolves.load(Ordering::Relaxed)
    }

    /// Number of stored element logs across both namespaces.
    pub fn element_count(&self) -> usize {
        self.inner.read().logs.len()
    }

    /// Bytes held by encoded frames, excluding blobs.
    pub fn frame_bytes(&self) -> usize {
        let inner = self.inner.read();
        let logs: usize = inner.logs.values().flatten().map(Bytes::len).sum();
        let rows: usize = inner.rows.values().flatten().map(Bytes::len).sum();
        logs + rows
    }
}

fn decode_log(frames: &[Bytes]) -> Result<MutationLog> {
    let mut log = MutationLog::new();
    for frame in frames {
        log.extend(codec::decode_mutations(frame)?);
    }
    Ok(log)
}

fn decode_row(id: &ExtendedDataRowId, frames: &[Bytes]) -> Result<ExtendedDataRow> {
    let mut log = ExtendedDataLog::new();
    for frame in frames {
        log.extend(codec::decode_extended(frame)?);
    }
    Ok(ExtendedDataRow {
        id: id.clone(),
        log,
    })
}

impl StorageAdapter for InMemoryStorage {
    fn append_mutations(
        &self,
        element_type: ElementType,
        id: &ElementId,
        batch: &[LogEntry<Mutation>],
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let frame = codec::encode_mutations(batch);
        let len = frame.len();
        self.inner
            .write()
            .logs
            .entry((element_type, id.clone()))
            .or_default()
            .push(frame);
        trace!(%element_type, id = %id, mutations = batch.len(), bytes = len, "memory.append");
        Ok(())
    }

    fn load_log(&self, element_type: ElementType, id: &ElementId) -> Result<Option<MutationLog>> {
        let inner = self.inner.read();
        match inner.logs.get(&(element_type, id.clone())) {
            Some(frames) => Ok(Some(decode_log(frames)?)),
            None => Ok(None),
        }
    }

    fn scan_logs(
        &self,
        element_type: ElementType,
        range: &IdRange,
    ) -> Result<Vec<(ElementId, MutationLog)>> {
        let inner = self.inner.read();
        let start = (element_type, range.lower_bound());
        let mut out = Vec::new();
        for ((kind, id), frames) in inner.logs.range((Bound::Included(start), Bound::Unbounded)) {
            if *kind != element_type || range.is_past(id) {
                break;
            }
            if range.contains(id) {
                out.push((id.clone(), decode_log(frames)?));
            }
        }
        debug!(%element_type, matched = out.len(), "memory.scan");
        Ok(out)
    }

    fn append_extended_data(
        &self,
        row: &ExtendedDataRowId,
        batch: &[LogEntry<ExtendedDataMutation>],
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let frame = codec::encode_extended(batch);
        self.inner
            .write()
            .rows
            .entry(row.clone())
            .or_default()
            .push(frame);
        trace!(row = %row, mutations = batch.len(), "memory.append_extended");
        Ok(())
    }

    fn load_extended_data_rows(
        &self,
        element_type: ElementType,
        id: &ElementId,
        table: Option<&str>,
    ) -> Result<Vec<ExtendedDataRow>> {
        let inner = self.inner.read();
        let start = ExtendedDataRowId::new(
            element_type,
            id.clone(),
            table.unwrap_or_default(),
            "",
        );
        let mut out = Vec::new();
        for (row_id, frames) in inner.rows.range((Bound::Included(start), Bound::Unbounded)) {
            if row_id.element_type != element_type || &row_id.element_id != id {
                break;
            }
            if let Some(table) = table {
                if row_id.table_name != table {
                    break;
                }
            }
            out.push(decode_row(row_id, frames)?);
        }
        Ok(out)
    }

    fn store_streaming_value(&self, key: &ResolutionKey, data: Bytes) -> Result<()> {
        trace!(key = %key, len = data.len(), "memory.store_blob");
        self.inner.write().blobs.insert(key.clone(), data);
        Ok(())
    }

    fn resolve_streaming_value(&self, key: &ResolutionKey) -> Result<Box<dyn Read + Send>> {
        let data = self
            .inner
            .read()
            .blobs
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::Backend(format!("no streaming value stored under {key}")))?;
        self.resolves.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(Cursor::new(data)))
    }

    fn set_graph_metadata(&self, key: &str, value: PropertyValue) -> Result<()> {
        self.inner.write().metadata.insert(key.to_owned(), value);
        Ok(())
    }

    fn get_graph_metadata(&self, key: &str) -> Result<Option<PropertyValue>> {
        Ok(self.inner.read().metadata.get(key).cloned())
    }
}
