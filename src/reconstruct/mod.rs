//! Element state reconstruction.
//!
//! Folding happens in two steps. [`fold_element`] turns a log into an
//! authorization-independent [`ElementState`] as of some time; the
//! [`ElementStateReconstructor`] then filters that state for one caller's
//! [`Authorizations`] and [`FetchHints`]. Both steps are pure functions of
//! their inputs.

#![forbid(unsafe_code)]

mod extended;
mod hidden;
mod history;
mod slots;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::Result;
use crate::model::{
    Edge, EdgeInfo, ElementView, FetchHints, HistoricalPropertyValue, HistoryQuery, Mutation,
    MutationLog, Property, Vertex,
};
use crate::security::{Authorizations, Visibility};
use crate::types::{Direction, ElementId, ElementType, Timestamp};

pub use extended::reconstruct_row;
use hidden::HiddenMarks;
use slots::{SlotKey, SlotTable};

/// Per-call read parameters: who is reading, what to materialize, and when.
#[derive(Clone, Debug)]
pub struct ReadContext {
    /// Caller authorizations.
    pub auths: Authorizations,
    /// What to materialize.
    pub hints: Arc<FetchHints>,
    /// Reconstruct as of this time; `None` reads the latest state.
    pub as_of: Option<Timestamp>,
}

impl ReadContext {
    /// Latest state with default hints.
    pub fn new(auths: Authorizations) -> Self {
        Self {
            auths,
            hints: Arc::new(FetchHints::default()),
            as_of: None,
        }
    }

    /// Replaces the fetch hints.
    pub fn with_hints(mut self, hints: FetchHints) -> Self {
        self.hints = Arc::new(hints);
        self
    }

    /// Reads as of `timestamp` (inclusive).
    pub fn as_of(mut self, timestamp: Timestamp) -> Self {
        self.as_of = Some(timestamp);
        self
    }

    pub(crate) fn cutoff(&self) -> Timestamp {
        self.as_of.unwrap_or(Timestamp::MAX)
    }
}

/// Edge endpoints recorded by `EdgeSetup`.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeEndpoints {
    /// Tail vertex.
    pub out_vertex_id: ElementId,
    /// Head vertex.
    pub in_vertex_id: ElementId,
}

#[derive(Clone, Debug)]
pub(crate) struct EdgeRefState {
    pub other_vertex_id: ElementId,
    pub label: String,
}

/// Authorization-independent state of one element at one point in time.
#[derive(Clone, Debug)]
pub struct ElementState {
    pub(crate) id: ElementId,
    pub(crate) element_type: ElementType,
    pub(crate) visibility: Visibility,
    pub(crate) timestamp: Timestamp,
    pub(crate) hidden: HiddenMarks,
    pub(crate) slots: SlotTable,
    pub(crate) endpoints: Option<EdgeEndpoints>,
    pub(crate) label: Option<String>,
    pub(crate) edge_refs: BTreeMap<(ElementId, Direction), EdgeRefState>,
}

impl ElementState {
    /// Element id.
    pub fn id(&self) -> &ElementId {
        &self.id
    }

    /// Current element visibility.
    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// Newest contributing timestamp.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Edge endpoints; `None` for vertices.
    pub fn endpoints(&self) -> Option<&EdgeEndpoints> {
        self.endpoints.as_ref()
    }

    /// Current edge label; `None` for vertices.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Every edge referenced by a vertex, regardless of the edges' own state.
    pub fn referenced_edge_ids(&self) -> BTreeSet<&ElementId> {
        self.edge_refs.keys().map(|(id, _)| id).collect()
    }

    /// Returns `true` when `auths` can read the element itself.
    pub fn readable_by(&self, auths: &Authorizations) -> bool {
        auths.can_read(&self.visibility)
    }

    /// Returns `true` when the element is hidden from `auths`.
    pub fn hidden_for(&self, auths: &Authorizations) -> bool {
        self.hidden.is_hidden_for(auths)
    }
}

/// Folds `log` as of `as_of` into the element's state.
///
/// Returns `None` when the element does not exist at that time: it was never
/// created, or its latest creating mutation precedes its latest soft delete.
/// Only mutations after the latest soft delete contribute, so a re-created
/// element starts with no properties and no hidden marks.
pub fn fold_element(
    element_type: ElementType,
    id: &ElementId,
    log: &MutationLog,
    as_of: Timestamp,
) -> Option<ElementState> {
    let ordered = log.ordered_as_of(as_of);
    let live_start = ordered
        .iter()
        .rposition(|entry| matches!(entry.mutation, Mutation::SoftDeleteElement))
        .map_or(0, |idx| idx + 1);

    let endpoints = ordered.iter().rev().find_map(|entry| match &entry.mutation {
        Mutation::EdgeSetup {
            out_vertex_id,
            in_vertex_id,
            ..
        } => Some(EdgeEndpoints {
            out_vertex_id: out_vertex_id.clone(),
            in_vertex_id: in_vertex_id.clone(),
        }),
        _ => None,
    });
    let mut label = ordered.iter().rev().find_map(|entry| match &entry.mutation {
        Mutation::EdgeSetup { label, .. } => Some(label.clone()),
        _ => None,
    });

    let mut created = false;
    let mut visibility = Visibility::empty();
    let mut timestamp = Timestamp::default();
    let mut hidden = HiddenMarks::default();
    let mut slots = SlotTable::default();
    let mut edge_refs = BTreeMap::new();

    for entry in &ordered[live_start..] {
        timestamp = timestamp.max(entry.timestamp);
        match &entry.mutation {
            Mutation::CreateElement { visibility: v } => {
                created = true;
                visibility = v.clone();
            }
            Mutation::AlterElementVisibility { new_visibility } => {
                visibility = new_visibility.clone();
            }
            Mutation::MarkElementHidden { hide_visibility } => {
                hidden.mark(hide_visibility, true);
            }
            Mutation::MarkElementVisible { hide_visibility } => {
                hidden.mark(hide_visibility, false);
            }
            Mutation::AddProperty {
                key,
                name,
                value,
                metadata,
                visibility: v,
            } => {
                slots.add(SlotKey::new(key, name, v), value, metadata, entry.timestamp);
            }
            Mutation::SoftDeleteProperty {
                key,
                name,
                visibility: v,
            } => {
                slots.soft_delete(key, name, v.as_ref(), entry.timestamp);
            }
            Mutation::AlterPropertyVisibility {
                key,
                name,
                old_visibility,
                new_visibility,
            } => {
                slots.alter_visibility(key, name, old_visibility, new_visibility, entry.timestamp);
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
            Mutation::MarkPropertyHidden {
                key,
                name,
                property_visibility,
                hide_visibility,
            } => {
                let slot = SlotKey::new(key, name, property_visibility);
                slots.mark_hidden(slot, hide_visibility, true);
            }
            Mutation::MarkPropertyVisible {
                key,
                name,
                property_visibility,
                hide_visibility,
            } => {
                let slot = SlotKey::new(key, name, property_visibility);
                slots.mark_hidden(slot, hide_visibility, false);
            }
            Mutation::EdgeSetup { label: l, .. } => {
                label = Some(l.clone());
            }
            Mutation::AlterEdgeLabel { new_label } => {
                label = Some(new_label.clone());
            }
            Mutation::AddEdgeRef {
                edge_id,
                direction,
                other_vertex_id,
                label: l,
            } => {
                edge_refs.insert(
                    (edge_id.clone(), *direction),
                    EdgeRefState {
                        other_vertex_id: other_vertex_id.clone(),
                        label: l.clone(),
                    },
                );
            }
            // Excluded by `live_start`.
            Mutation::SoftDeleteElement => {}
        }
    }

    if !created {
        trace!(id = %id, %element_type, "reconstruct.element.absent");
        return None;
    }
    if element_type == ElementType::Edge && endpoints.is_none() {
        trace!(id = %id, "reconstruct.edge.missing_setup");
        return None;
    }
    Some(ElementState {
        id: id.clone(),
        element_type,
        visibility,
        timestamp,
        hidden,
        slots,
        endpoints,
        label: if element_type == ElementType::Edge {
            label
        } else {
            None
        },
        edge_refs,
    })
}

/// Source of edge logs used to validate a vertex's edge references.
pub trait EdgeLogSource {
    /// Returns the log of edge `id`, if stored.
    fn edge_log(&self, id: &ElementId) -> Result<Option<MutationLog>>;
}

impl EdgeLogSource for HashMap<ElementId, MutationLog> {
    fn edge_log(&self, id: &ElementId) -> Result<Option<MutationLog>> {
        Ok(self.get(id).cloned())
    }
}

impl EdgeLogSource for BTreeMap<ElementId, MutationLog> {
    fn edge_log(&self, id: &ElementId) -> Result<Option<MutationLog>> {
        Ok(self.get(id).cloned())
    }
}

/// Folds logs into views for one caller.
pub struct ElementStateReconstructor;

impl ElementStateReconstructor {
    /// Reconstructs vertex `id`, validating its edge references against `edges`.
    pub fn vertex(
        id: &ElementId,
        log: &MutationLog,
        ctx: &ReadContext,
        edges: &dyn EdgeLogSource,
    ) -> Result<Option<Vertex>> {
        let Some(state) = fold_element(ElementType::Vertex, id, log, ctx.cutoff()) else {
            return Ok(None);
        };
        let Some(view) = Self::view(&state, ctx) else {
            return Ok(None);
        };
        let edges = if ctx.hints.loads_edges() {
            Some(Self::edge_infos(&state, ctx, edges)?)
        } else {
            None
        };
        Ok(Some(Vertex { view, edges }))
    }

    /// Reconstructs edge `id`.
    pub fn edge(id: &ElementId, log: &MutationLog, ctx: &ReadContext) -> Option<Edge> {
        let state = fold_element(ElementType::Edge, id, log, ctx.cutoff())?;
        Self::edge_from_state(&state, ctx)
    }

    /// Filters a folded edge state for one caller.
    pub fn edge_from_state(state: &ElementState, ctx: &ReadContext) -> Option<Edge> {
        let view = Self::view(state, ctx)?;
        let endpoints = state.endpoints.as_ref()?;
        Some(Edge {
            view,
            out_vertex_id: endpoints.out_vertex_id.clone(),
            in_vertex_id: endpoints.in_vertex_id.clone(),
            label: state.label.clone().unwrap_or_default(),
        })
    }

    /// Every readable slot transition of the element, newest first.
    pub fn history(
        log: &MutationLog,
        query: &HistoryQuery,
        auths: &Authorizations,
    ) -> Vec<HistoricalPropertyValue> {
        history::historical_values(log, query, auths)
    }

    /// Readability, hidden state and properties shared by vertices and edges.
    fn view(state: &ElementState, ctx: &ReadContext) -> Option<ElementView> {
        if !state.readable_by(&ctx.auths) {
            trace!(id = %state.id, "reconstruct.element.unreadable");
            return None;
        }
        let hidden_visibilities = state.hidden.hidden_for(&ctx.auths);
        if !hidden_visibilities.is_empty() && !ctx.hints.include_hidden {
            trace!(id = %state.id, "reconstruct.element.hidden");
            return None;
        }
        let properties = if ctx.hints.has_properties() {
            Some(Self::properties(state, ctx))
        } else {
            None
        };
        Some(ElementView {
            id: state.id.clone(),
            element_type: state.element_type,
            visibility: state.visibility.clone(),
            timestamp: state.timestamp,
            hidden_visibilities,
            properties,
            extended_tables: None,
            hints: Arc::clone(&ctx.hints),
            as_of: ctx.as_of,
        })
    }

    fn properties(state: &ElementState, ctx: &ReadContext) -> Vec<Property> {
        let hints = &ctx.hints;
        state
            .slots
            .readable(&ctx.auths)
            .filter(|(slot, _)| hints.includes_property(&slot.name))
            .filter_map(|(slot, slot_state)| {
                let hidden_visibilities = slot_state.hidden.hidden_for(&ctx.auths);
                if !hidden_visibilities.is_empty() && !hints.include_hidden {
                    return None;
                }
                let metadata = if hints.has_metadata() {
                    Some(
                        slot_state
                            .metadata
                            .filtered(&ctx.auths, &hints.property_metadata),
                    )
                } else {
                    None
                };
                Some(Property {
                    key: slot.key.clone(),
                    name: slot.name.clone(),
                    value: slot_state.value.clone(),
                    visibility: slot.visibility.clone(),
                    timestamp: slot_state.timestamp,
                    hidden_visibilities,
                    metadata,
                    hints: Arc::clone(hints),
                })
            })
            .collect()
    }

    fn edge_infos(
        state: &ElementState,
        ctx: &ReadContext,
        source: &dyn EdgeLogSource,
    ) -> Result<Vec<EdgeInfo>> {
        let hints = &ctx.hints;
        let mut folded: FxHashMap<&ElementId, Option<ElementState>> = FxHashMap::default();
        let mut infos = Vec::new();
        for ((edge_id, direction), edge_ref) in &state.edge_refs {
            if !hints.allows_edge_counts(*direction) {
                continue;
            }
            if !folded.contains_key(edge_id) {
                let edge_state = match source.edge_log(edge_id)? {
                    Some(log) => fold_element(ElementType::Edge, edge_id, &log, ctx.cutoff()),
                    None => None,
                };
                folded.insert(edge_id, edge_state);
            }
            let Some(Some(edge)) = folded.get(edge_id) else {
                continue;
            };
            if !endpoint_matches(edge, &state.id, *direction, &edge_ref.other_vertex_id) {
                trace!(vertex = %state.id, edge = %edge_id, "reconstruct.edge_ref.stale");
                continue;
            }
            if !edge.readable_by(&ctx.auths) {
                continue;
            }
            let hidden = edge.hidden_for(&ctx.auths);
            if hidden && !hints.include_hidden {
                continue;
            }
            infos.push(EdgeInfo {
                edge_id: edge_id.clone(),
                label: edge
                    .label
                    .clone()
                    .unwrap_or_else(|| edge_ref.label.clone()),
                other_vertex_id: edge_ref.other_vertex_id.clone(),
                direction: *direction,
                visibility: edge.visibility.clone(),
                hidden,
            });
        }
        Ok(infos)
    }
}

fn endpoint_matches(
    edge: &ElementState,
    vertex_id: &ElementId,
    direction: Direction,
    other_vertex_id: &ElementId,
) -> bool {
    let Some(endpoints) = &edge.endpoints else {
        return false;
    };
    match direction {
        Direction::Out => {
            &endpoints.out_vertex_id == vertex_id && &endpoints.in_vertex_id == other_vertex_id
        }
        Direction::In => {
            &endpoints.in_vertex_id == vertex_id && &endpoints.out_vertex_id == other_vertex_id
        }
        Direction::Both => false,
    }
}
