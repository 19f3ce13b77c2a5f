//! Graph facade.
//!
//! [`Graph`] ties the pieces together: it turns [`ElementMutation`] batches
//! into timestamped log appends on a [`StorageAdapter`], and serves reads by
//! loading log snapshots and handing them to the reconstruction core.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::{GraphError, Result};
use crate::model::{
    Edge, ExtendedDataRowId, ExtendedDataRowView, HistoricalPropertyValue, HistoryQuery,
    LogEntry, Mutation, MutationLog, TableSelection, Vertex,
};
use crate::reconstruct::{
    fold_element, reconstruct_row, EdgeEndpoints, EdgeLogSource, ElementState,
    ElementStateReconstructor, ReadContext,
};
use crate::security::{Authorizations, Visibility};
use crate::storage::{default_metrics, GraphMetrics, IdRange, StorageAdapter};
use crate::streaming::{ResolutionKey, StreamingPropertyValue, StreamingValue, StreamingValueRef};
use crate::types::{Direction, ElementId, ElementType, Timestamp};
use crate::value::PropertyValue;

/// Element mutation builder.
pub mod builder;

mod clock;

/// Change notifications.
pub mod events;

/// Graph configuration.
pub mod options;

pub use builder::ElementMutation;
pub use events::{GraphEvent, GraphEventListener};
pub use options::{GraphOptions, DEFAULT_MAX_INLINE_VALUE_LEN};

use builder::{Origin, Pending, PendingChange, PendingExtended};
use clock::BatchClock;
use events::{element_event, extended_event};

const SPILLED_STR_TYPE: &str = "text/plain";
const SPILLED_BYTES_TYPE: &str = "application/octet-stream";

/// A graph hosted on a [`StorageAdapter`].
pub struct Graph {
    storage: Arc<dyn StorageAdapter>,
    metrics: Arc<dyn GraphMetrics>,
    default_fetch_hints: crate::model::FetchHints,
    spool_threshold: usize,
    max_inline_value_len: Option<usize>,
    strict_write_visibility: bool,
    clock: BatchClock,
    listeners: RwLock<Vec<Arc<dyn GraphEventListener>>>,
}

struct StorageEdges<'a>(&'a dyn StorageAdapter);

impl EdgeLogSource for StorageEdges<'_> {
    fn edge_log(&self, id: &ElementId) -> Result<Option<MutationLog>> {
        self.0.load_log(ElementType::Edge, id)
    }
}

impl Graph {
    /// Opens a graph over `options.storage`.
    pub fn open(options: GraphOptions) -> Self {
        let metrics = options.metrics.clone().unwrap_or_else(default_metrics);
        Self {
            storage: options.storage,
            metrics,
            default_fetch_hints: options.default_fetch_hints,
            spool_threshold: options.streaming_spool_threshold,
            max_inline_value_len: options.max_inline_value_len,
            strict_write_visibility: options.strict_write_visibility,
            clock: BatchClock::default(),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// The adapter backing this graph.
    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    /// Latest-state read context with the configured default hints.
    pub fn read_context(&self, auths: Authorizations) -> ReadContext {
        ReadContext::new(auths).with_hints(self.default_fetch_hints.clone())
    }

    /// Registers a listener for subsequent saves.
    pub fn add_event_listener(&self, listener: Arc<dyn GraphEventListener>) {
        self.listeners.write().push(listener);
    }

    /// Starts a batch that creates (or re-creates) vertex `id`.
    pub fn prepare_vertex(&self, id: impl Into<ElementId>, visibility: Visibility) -> ElementMutation {
        ElementMutation::new(ElementType::Vertex, id.into(), Origin::NewVertex { visibility })
    }

    /// Starts a batch that creates (or re-creates) edge `id` from `out_vertex_id` to `in_vertex_id`.
    pub fn prepare_edge(
        &self,
        id: impl Into<ElementId>,
        out_vertex_id: impl Into<ElementId>,
        in_vertex_id: impl Into<ElementId>,
        label: impl Into<String>,
        visibility: Visibility,
    ) -> ElementMutation {
        ElementMutation::new(
            ElementType::Edge,
            id.into(),
            Origin::NewEdge {
                visibility,
                out_vertex_id: out_vertex_id.into(),
                in_vertex_id: in_vertex_id.into(),
                label: label.into(),
            },
        )
    }

    /// Starts a batch against an existing vertex.
    pub fn mutate_vertex(&self, id: impl Into<ElementId>) -> ElementMutation {
        ElementMutation::new(ElementType::Vertex, id.into(), Origin::Existing)
    }

    /// Starts a batch against an existing edge.
    pub fn mutate_edge(&self, id: impl Into<ElementId>) -> ElementMutation {
        ElementMutation::new(ElementType::Edge, id.into(), Origin::Existing)
    }

    /// Saves several batches in order; there is no atomicity across elements.
    pub fn save_all(
        &self,
        mutations: impl IntoIterator<Item = ElementMutation>,
        auths: &Authorizations,
    ) -> Result<Vec<Timestamp>> {
        mutations
            .into_iter()
            .map(|mutation| self.save(mutation, auths))
            .collect()
    }

    /// Appends one batch and returns its timestamp.
    ///
    /// Large inline values are moved out of line, streaming payloads are
    /// stored before the log entry that references them, edges are linked to
    /// their vertices, and deleting a vertex deletes its live edges. Events
    /// fire only after every append succeeded.
    pub fn save(&self, mutation: ElementMutation, auths: &Authorizations) -> Result<Timestamp> {
        let ElementMutation {
            element_type,
            id,
            origin,
            timestamp,
            changes,
            extended,
        } = mutation;
        self.validate(element_type, &origin, &changes, &extended, auths)?;

        let batch_ts = match timestamp {
            Some(ts) => {
                self.clock.observe(ts);
                ts
            }
            None => self.clock.next(),
        };
        for ts in changes.iter().filter_map(|pending| pending.timestamp) {
            self.clock.observe(ts);
        }

        let log = self.storage.load_log(element_type, &id)?;
        let current = log
            .as_ref()
            .and_then(|log| fold_element(element_type, &id, log, Timestamp::MAX));

        let mut entries = Vec::with_capacity(changes.len() + 2);
        let mut events = Vec::new();
        match &origin {
            Origin::NewVertex { visibility } => {
                entries.push(LogEntry::new(
                    batch_ts,
                    Mutation::CreateElement {
                        visibility: visibility.clone(),
                    },
                ));
                events.extend(creation_event(element_type, &id, &origin, current.as_ref(), batch_ts));
            }
            Origin::NewEdge {
                visibility,
                out_vertex_id,
                in_vertex_id,
                label,
            } => {
                if let Some(recorded) = log.as_ref().and_then(recorded_endpoints) {
                    if &recorded.out_vertex_id != out_vertex_id || &recorded.in_vertex_id != in_vertex_id {
                        return Err(GraphError::InvalidArgument(format!(
                            "edge '{id}' endpoints cannot change"
                        )));
                    }
                }
                entries.push(LogEntry::new(
                    batch_ts,
                    Mutation::EdgeSetup {
                        out_vertex_id: out_vertex_id.clone(),
                        in_vertex_id: in_vertex_id.clone(),
                        label: label.clone(),
                    },
                ));
                entries.push(LogEntry::new(
                    batch_ts,
                    Mutation::CreateElement {
                        visibility: visibility.clone(),
                    },
                ));
                events.extend(creation_event(element_type, &id, &origin, current.as_ref(), batch_ts));
            }
            Origin::Existing => {
                let only_deletes = changes.iter().all(|pending| {
                    matches!(pending.change, PendingChange::Mutation(Mutation::SoftDeleteElement))
                });
                let redelete = log.is_some() && only_deletes && extended.is_empty();
                if current.is_none() && !redelete {
                    return Err(GraphError::not_found(element_type, &id));
                }
            }
        }

        for Pending { change, timestamp } in changes {
            let ts = timestamp.unwrap_or(batch_ts);
            let mutation = match change {
                PendingChange::Mutation(mutation) => self.spill(element_type, &id, mutation, ts)?,
                PendingChange::Streaming {
                    key,
                    name,
                    value,
                    metadata,
                    visibility,
                } => {
                    let reference = self.store_stream(element_type, &id, &key, &name, &visibility, ts, &value)?;
                    Mutation::AddProperty {
                        key,
                        name,
                        value: PropertyValue::Streaming(reference),
                        metadata,
                        visibility,
                    }
                }
            };
            let live_change = current.is_some() || !matches!(origin, Origin::Existing);
            if live_change {
                events.extend(element_event(element_type, &id, &mutation, ts));
            }
            entries.push(LogEntry::new(ts, mutation));
        }

        if !entries.is_empty() {
            self.storage.append_mutations(element_type, &id, &entries)?;
            self.metrics.mutations_appended(element_type, entries.len());
        }
        debug!(%element_type, id = %id, mutations = entries.len(), ts = %batch_ts, "graph.save.append");

        if let Origin::NewEdge {
            out_vertex_id,
            in_vertex_id,
            label,
            ..
        } = &origin
        {
            if current.is_none() {
                self.link_edge(&id, out_vertex_id, in_vertex_id, label, batch_ts)?;
            }
        }

        let deletes_vertex = element_type == ElementType::Vertex
            && entries
                .iter()
                .any(|entry| matches!(entry.mutation, Mutation::SoftDeleteElement));
        if deletes_vertex {
            if let Some(state) = &current {
                self.cascade_vertex_delete(state, batch_ts, &mut events)?;
            }
        }

        self.save_extended(element_type, &id, extended, batch_ts, &mut events)?;
        self.emit(&events);
        Ok(batch_ts)
    }

    fn validate(
        &self,
        element_type: ElementType,
        origin: &Origin,
        changes: &[Pending],
        extended: &[PendingExtended],
        auths: &Authorizations,
    ) -> Result<()> {
        for pending in changes {
            if let PendingChange::Mutation(mutation) = &pending.change {
                let misplaced = match element_type {
                    ElementType::Vertex => mutation.is_edge_only(),
                    ElementType::Edge => mutation.is_vertex_only(),
                };
                if misplaced {
                    return Err(GraphError::InvalidArgument(format!(
                        "{} cannot be applied to a {element_type}",
                        mutation.kind_name()
                    )));
                }
            }
        }
        if !self.strict_write_visibility {
            return Ok(());
        }
        let mut written: Vec<&Visibility> = Vec::new();
        match origin {
            Origin::NewVertex { visibility } | Origin::NewEdge { visibility, .. } => {
                written.push(visibility)
            }
            Origin::Existing => {}
        }
        for pending in changes {
            match &pending.change {
                PendingChange::Mutation(mutation) => written.extend(mutation.visibilities()),
                PendingChange::Streaming { visibility, .. } => written.push(visibility),
            }
        }
        for pending in extended {
            written.extend(pending.mutation.visibilities());
        }
        match written.into_iter().find(|visibility| !auths.can_read(visibility)) {
            Some(visibility) => Err(GraphError::Security(format!(
                "authorizations cannot write visibility '{visibility}'"
            ))),
            None => Ok(()),
        }
    }

    /// Moves an oversized `Str`/`Bytes` property value to the blob store.
    fn spill(
        &self,
        element_type: ElementType,
        id: &ElementId,
        mutation: Mutation,
        ts: Timestamp,
    ) -> Result<Mutation> {
        let Some(limit) = self.max_inline_value_len else {
            return Ok(mutation);
        };
        match mutation {
            Mutation::AddProperty {
                key,
                name,
                value,
                metadata,
                visibility,
            } if value.inline_len() > limit => {
                let payload = match value {
                    PropertyValue::Str(s) => StreamingPropertyValue::new(SPILLED_STR_TYPE, s.into_bytes()),
                    PropertyValue::Bytes(b) => StreamingPropertyValue::new(SPILLED_BYTES_TYPE, b),
                    other => {
                        return Ok(Mutation::AddProperty {
                            key,
                            name,
                            value: other,
                            metadata,
                            visibility,
                        })
                    }
                };
                trace!(id = %id, name = %name, len = payload.data().len(), "graph.save.spill");
                let reference =
                    self.store_stream(element_type, id, &key, &name, &visibility, ts, &payload)?;
                Ok(Mutation::AddProperty {
                    key,
                    name,
                    value: PropertyValue::Streaming(reference),
                    metadata,
                    visibility,
                })
            }
            other => Ok(other),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn store_stream(
        &self,
        element_type: ElementType,
        id: &ElementId,
        key: &str,
        name: &str,
        visibility: &Visibility,
        ts: Timestamp,
        value: &StreamingPropertyValue,
    ) -> Result<StreamingValueRef> {
        let resolution = ResolutionKey {
            element_type,
            element_id: id.clone(),
            property_key: key.to_owned(),
            property_name: name.to_owned(),
            visibility: visibility.as_str().to_owned(),
            timestamp: ts,
        };
        let reference = value.to_ref(resolution);
        self.storage
            .store_streaming_value(&reference.key, value.data().clone())?;
        Ok(reference)
    }

    fn link_edge(
        &self,
        edge_id: &ElementId,
        out_vertex_id: &ElementId,
        in_vertex_id: &ElementId,
        label: &str,
        ts: Timestamp,
    ) -> Result<()> {
        let out_ref = LogEntry::new(
            ts,
            Mutation::AddEdgeRef {
                edge_id: edge_id.clone(),
                direction: Direction::Out,
                other_vertex_id: in_vertex_id.clone(),
                label: label.to_owned(),
            },
        );
        let in_ref = LogEntry::new(
            ts,
            Mutation::AddEdgeRef {
                edge_id: edge_id.clone(),
                direction: Direction::In,
                other_vertex_id: out_vertex_id.clone(),
                label: label.to_owned(),
            },
        );
        if out_vertex_id == in_vertex_id {
            self.storage
                .append_mutations(ElementType::Vertex, out_vertex_id, &[out_ref, in_ref])?;
        } else {
            self.storage
                .append_mutations(ElementType::Vertex, out_vertex_id, &[out_ref])?;
            self.storage
                .append_mutations(ElementType::Vertex, in_vertex_id, &[in_ref])?;
        }
        trace!(edge = %edge_id, out = %out_vertex_id, inn = %in_vertex_id, "graph.save.link_edge");
        Ok(())
    }

    fn cascade_vertex_delete(
        &self,
        vertex: &ElementState,
        ts: Timestamp,
        events: &mut Vec<GraphEvent>,
    ) -> Result<()> {
        for edge_id in vertex.referenced_edge_ids() {
            let Some(log) = self.storage.load_log(ElementType::Edge, edge_id)? else {
                continue;
            };
            if fold_element(ElementType::Edge, edge_id, &log, Timestamp::MAX).is_none() {
                continue;
            }
            self.storage.append_mutations(
                ElementType::Edge,
                edge_id,
                &[LogEntry::new(ts, Mutation::SoftDeleteElement)],
            )?;
            self.metrics.mutations_appended(ElementType::Edge, 1);
            debug!(vertex = %vertex.id(), edge = %edge_id, "graph.save.cascade_delete");
            events.push(GraphEvent::DeleteElement {
                element_type: ElementType::Edge,
                id: edge_id.clone(),
                timestamp: ts,
            });
        }
        Ok(())
    }

    fn save_extended(
        &self,
        element_type: ElementType,
        id: &ElementId,
        extended: Vec<PendingExtended>,
        ts: Timestamp,
        events: &mut Vec<GraphEvent>,
    ) -> Result<()> {
        let mut rows: BTreeMap<ExtendedDataRowId, Vec<LogEntry<_>>> = BTreeMap::new();
        for PendingExtended {
            table,
            row,
            mutation,
        } in extended
        {
            let row_id = ExtendedDataRowId::new(element_type, id.clone(), table, row);
            rows.entry(row_id)
                .or_default()
                .push(LogEntry::new(ts, mutation));
        }
        for (row_id, batch) in rows {
            self.storage.append_extended_data(&row_id, &batch)?;
            events.extend(
                batch
                    .iter()
                    .map(|entry| extended_event(&row_id, &entry.mutation, ts)),
            );
            trace!(row = %row_id, mutations = batch.len(), "graph.save.extended");
        }
        Ok(())
    }

    fn emit(&self, events: &[GraphEvent]) {
        if events.is_empty() {
            return;
        }
        let listeners = self.listeners.read().clone();
        for event in events {
            for listener in &listeners {
                listener.on_graph_event(event);
            }
        }
    }

    /// Reconstructs vertex `id`; `None` when absent, deleted, unreadable or hidden.
    pub fn vertex(&self, id: &ElementId, ctx: &ReadContext) -> Result<Option<Vertex>> {
        match self.storage.load_log(ElementType::Vertex, id)? {
            Some(log) => self.materialize_vertex(id, &log, ctx),
            None => {
                self.metrics.element_reconstructed(ElementType::Vertex, false);
                Ok(None)
            }
        }
    }

    /// Reconstructs edge `id`; `None` when absent, deleted, unreadable or hidden.
    pub fn edge(&self, id: &ElementId, ctx: &ReadContext) -> Result<Option<Edge>> {
        match self.storage.load_log(ElementType::Edge, id)? {
            Some(log) => self.materialize_edge(id, &log, ctx),
            None => {
                self.metrics.element_reconstructed(ElementType::Edge, false);
                Ok(None)
            }
        }
    }

    /// Like [`Graph::vertex`], failing with [`GraphError::NotFound`] instead of `None`.
    pub fn vertex_required(&self, id: &ElementId, ctx: &ReadContext) -> Result<Vertex> {
        self.vertex(id, ctx)?
            .ok_or_else(|| GraphError::not_found(ElementType::Vertex, id))
    }

    /// Like [`Graph::edge`], failing with [`GraphError::NotFound`] instead of `None`.
    pub fn edge_required(&self, id: &ElementId, ctx: &ReadContext) -> Result<Edge> {
        self.edge(id, ctx)?
            .ok_or_else(|| GraphError::not_found(ElementType::Edge, id))
    }

    /// Vertices whose id starts with `prefix`, in id order.
    pub fn vertices_with_prefix(&self, prefix: &str, ctx: &ReadContext) -> Result<Vec<Vertex>> {
        self.scan_vertices(&IdRange::Prefix(prefix.to_owned()), ctx)
    }

    /// Vertices with ids in `[start, end)`, in id order.
    pub fn vertices_in_range(
        &self,
        start: Option<ElementId>,
        end: Option<ElementId>,
        ctx: &ReadContext,
    ) -> Result<Vec<Vertex>> {
        self.scan_vertices(&IdRange::Between { start, end }, ctx)
    }

    /// Edges whose id starts with `prefix`, in id order.
    pub fn edges_with_prefix(&self, prefix: &str, ctx: &ReadContext) -> Result<Vec<Edge>> {
        self.scan_edges(&IdRange::Prefix(prefix.to_owned()), ctx)
    }

    /// Edges with ids in `[start, end)`, in id order.
    pub fn edges_in_range(
        &self,
        start: Option<ElementId>,
        end: Option<ElementId>,
        ctx: &ReadContext,
    ) -> Result<Vec<Edge>> {
        self.scan_edges(&IdRange::Between { start, end }, ctx)
    }

    fn scan_vertices(&self, range: &IdRange, ctx: &ReadContext) -> Result<Vec<Vertex>> {
        let mut out = Vec::new();
        for (id, log) in self.storage.scan_logs(ElementType::Vertex, range)? {
            out.extend(self.materialize_vertex(&id, &log, ctx)?);
        }
        Ok(out)
    }

    fn scan_edges(&self, range: &IdRange, ctx: &ReadContext) -> Result<Vec<Edge>> {
        let mut out = Vec::new();
        for (id, log) in self.storage.scan_logs(ElementType::Edge, range)? {
            out.extend(self.materialize_edge(&id, &log, ctx)?);
        }
        Ok(out)
    }

    fn materialize_vertex(
        &self,
        id: &ElementId,
        log: &MutationLog,
        ctx: &ReadContext,
    ) -> Result<Option<Vertex>> {
        let edges = StorageEdges(self.storage.as_ref());
        let mut vertex = ElementStateReconstructor::vertex(id, log, ctx, &edges)?;
        if let Some(vertex) = vertex.as_mut() {
            vertex.view.extended_tables =
                self.extended_table_names(ElementType::Vertex, id, ctx)?;
        }
        self.metrics
            .element_reconstructed(ElementType::Vertex, vertex.is_some());
        Ok(vertex)
    }

    fn materialize_edge(
        &self,
        id: &ElementId,
        log: &MutationLog,
        ctx: &ReadContext,
    ) -> Result<Option<Edge>> {
        let mut edge = ElementStateReconstructor::edge(id, log, ctx);
        if let Some(edge) = edge.as_mut() {
            edge.view.extended_tables = self.extended_table_names(ElementType::Edge, id, ctx)?;
        }
        self.metrics
            .element_reconstructed(ElementType::Edge, edge.is_some());
        Ok(edge)
    }

    fn extended_table_names(
        &self,
        element_type: ElementType,
        id: &ElementId,
        ctx: &ReadContext,
    ) -> Result<Option<BTreeSet<String>>> {
        let selection = &ctx.hints.extended_data_tables;
        if *selection == TableSelection::None {
            return Ok(None);
        }
        let rows = self.storage.load_extended_data_rows(element_type, id, None)?;
        let names = rows
            .iter()
            .filter(|row| selection.includes(&row.id.table_name))
            .filter(|row| {
                reconstruct_row(row, &ctx.auths, ctx.cutoff(), ctx.hints.include_hidden).is_some()
            })
            .map(|row| row.id.table_name.clone())
            .collect();
        Ok(Some(names))
    }

    /// Fails with [`GraphError::Security`] when any of `ids` exists but cannot
    /// be read with `auths`, and with [`GraphError::NotFound`] when one does
    /// not exist.
    pub fn ensure_readable(
        &self,
        element_type: ElementType,
        ids: &[ElementId],
        auths: &Authorizations,
    ) -> Result<()> {
        for id in ids {
            let state = self
                .storage
                .load_log(element_type, id)?
                .and_then(|log| fold_element(element_type, id, &log, Timestamp::MAX))
                .ok_or_else(|| GraphError::not_found(element_type, id))?;
            if !state.readable_by(auths) {
                debug!(%element_type, id = %id, "graph.ensure_readable.denied");
                return Err(GraphError::Security(format!(
                    "{element_type} '{id}' is not readable with the supplied authorizations"
                )));
            }
        }
        Ok(())
    }

    /// Edges incident to `vertex` in `direction`, reconstructed with `ctx`.
    pub fn edges_of(
        &self,
        vertex: &Vertex,
        direction: Direction,
        ctx: &ReadContext,
    ) -> Result<Vec<Edge>> {
        let mut out = Vec::new();
        for edge_id in vertex.edge_ids(direction)? {
            out.extend(self.edge(edge_id, ctx)?);
        }
        Ok(out)
    }

    /// The `(out, in)` vertices of `edge`, each `None` when not visible.
    pub fn edge_vertices(
        &self,
        edge: &Edge,
        ctx: &ReadContext,
    ) -> Result<(Option<Vertex>, Option<Vertex>)> {
        Ok((
            self.vertex(edge.out_vertex_id(), ctx)?,
            self.vertex(edge.in_vertex_id(), ctx)?,
        ))
    }

    /// Historical property values of an element, newest first.
    ///
    /// Fails with [`GraphError::NotFound`] when the element was never stored
    /// or currently exists with a visibility `auths` cannot read. A deleted
    /// element keeps its history.
    pub fn history(
        &self,
        element_type: ElementType,
        id: &ElementId,
        query: &HistoryQuery,
        auths: &Authorizations,
    ) -> Result<Vec<HistoricalPropertyValue>> {
        let log = self
            .storage
            .load_log(element_type, id)?
            .ok_or_else(|| GraphError::not_found(element_type, id))?;
        if let Some(state) = fold_element(element_type, id, &log, Timestamp::MAX) {
            if !state.readable_by(auths) {
                return Err(GraphError::not_found(element_type, id));
            }
        }
        let values = ElementStateReconstructor::history(&log, query, auths);
        self.metrics.history_scanned(values.len());
        Ok(values)
    }

    /// Extended-data rows of an element, optionally limited to one table.
    ///
    /// Rows of an element that does not exist for `ctx` are unreachable.
    pub fn extended_data_rows(
        &self,
        element_type: ElementType,
        id: &ElementId,
        table: Option<&str>,
        ctx: &ReadContext,
    ) -> Result<Vec<ExtendedDataRowView>> {
        let owner_visible = match self.storage.load_log(element_type, id)? {
            Some(log) => fold_element(element_type, id, &log, ctx.cutoff()).map_or(false, |state| {
                state.readable_by(&ctx.auths)
                    && (ctx.hints.include_hidden || !state.hidden_for(&ctx.auths))
            }),
            None => false,
        };
        if !owner_visible {
            trace!(%element_type, id = %id, "graph.extended.owner_absent");
            return Ok(Vec::new());
        }
        let rows = self
            .storage
            .load_extended_data_rows(element_type, id, table)?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                reconstruct_row(row, &ctx.auths, ctx.cutoff(), ctx.hints.include_hidden)
            })
            .collect())
    }

    /// Opens the payload behind a streaming property value.
    ///
    /// Every call fetches from the adapter once; re-reading within the
    /// returned value uses [`StreamingValue::mark`] and [`StreamingValue::reset`].
    pub fn open_stream(&self, reference: &StreamingValueRef) -> Result<StreamingValue> {
        let backend = self.storage.resolve_streaming_value(&reference.key)?;
        let value = StreamingValue::materialize(backend, reference, self.spool_threshold)?;
        self.metrics.streaming_fetch(reference.length);
        debug!(key = %reference.key, len = reference.length, spooled = value.is_spooled(), "graph.stream.open");
        Ok(value)
    }

    /// Sets a graph-wide metadata value.
    pub fn set_graph_metadata(&self, key: &str, value: impl Into<PropertyValue>) -> Result<()> {
        self.storage.set_graph_metadata(key, value.into())
    }

    /// Reads a graph-wide metadata value.
    pub fn get_graph_metadata(&self, key: &str) -> Result<Option<PropertyValue>> {
        self.storage.get_graph_metadata(key)
    }
}

fn creation_event(
    element_type: ElementType,
    id: &ElementId,
    origin: &Origin,
    current: Option<&ElementState>,
    timestamp: Timestamp,
) -> Option<GraphEvent> {
    let visibility = match origin {
        Origin::NewVertex { visibility } | Origin::NewEdge { visibility, .. } => visibility,
        Origin::Existing => return None,
    };
    if let Some(state) = current {
        if state.visibility() == visibility {
            return None;
        }
        return Some(GraphEvent::AlterElementVisibility {
            element_type,
            id: id.clone(),
            visibility: visibility.clone(),
            timestamp,
        });
    }
    let event = match origin {
        Origin::NewEdge {
            out_vertex_id,
            in_vertex_id,
            label,
            ..
        } => GraphEvent::AddEdge {
            id: id.clone(),
            out_vertex_id: out_vertex_id.clone(),
            in_vertex_id: in_vertex_id.clone(),
            label: label.clone(),
            timestamp,
        },
        _ => GraphEvent::AddVertex {
            id: id.clone(),
            timestamp,
        },
    };
    Some(event)
}

fn recorded_endpoints(log: &MutationLog) -> Option<EdgeEndpoints> {
    log.entries().iter().find_map(|entry| match &entry.mutation {
        Mutation::EdgeSetup {
            out_vertex_id,
            in_vertex_id,
            ..
        } => Some(EdgeEndpoints {
            out_vertex_id: out_vertex_id.clone(),
            in_vertex_id: in_vertex_id.clone(),
        }),
        _ => None,
    })
}
