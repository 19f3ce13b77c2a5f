#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{GraphError, Result};
use crate::security::Visibility;
use crate::types::{Direction, ElementId, ElementType, Timestamp};
use crate::value::PropertyValue;

use super::fetch_hints::FetchHints;
use super::property::Property;

/// State shared by vertex and edge views.
#[derive(Clone, Debug)]
pub struct ElementView {
    pub(crate) id: ElementId,
    pub(crate) element_type: ElementType,
    pub(crate) visibility: Visibility,
    pub(crate) timestamp: Timestamp,
    pub(crate) hidden_visibilities: SmallVec<[Visibility; 2]>,
    pub(crate) properties: Option<Vec<Property>>,
    pub(crate) extended_tables: Option<BTreeSet<String>>,
    pub(crate) hints: Arc<FetchHints>,
    pub(crate) as_of: Option<Timestamp>,
}

/// Read surface common to [`Vertex`] and [`Edge`].
pub trait Element {
    /// Shared view state.
    fn view(&self) -> &ElementView;

    /// Element id.
    fn id(&self) -> &ElementId {
        &self.view().id
    }

    /// Vertex or edge.
    fn element_type(&self) -> ElementType {
        self.view().element_type
    }

    /// Current element visibility.
    fn visibility(&self) -> &Visibility {
        &self.view().visibility
    }

    /// Timestamp of the newest mutation contributing to this view.
    fn timestamp(&self) -> Timestamp {
        self.view().timestamp
    }

    /// Time the view was reconstructed at; `None` means latest.
    fn as_of(&self) -> Option<Timestamp> {
        self.view().as_of
    }

    /// Returns `true` when the element is hidden from the reading caller.
    fn is_hidden(&self) -> bool {
        !self.view().hidden_visibilities.is_empty()
    }

    /// Hide visibilities currently hiding the element from the caller.
    fn hidden_visibilities(&self) -> &[Visibility] {
        &self.view().hidden_visibilities
    }

    /// Hints the view was materialized with.
    fn fetch_hints(&self) -> &FetchHints {
        &self.view().hints
    }

    /// All materialized properties.
    fn properties(&self) -> Result<&[Property]> {
        self.view()
            .properties
            .as_deref()
            .ok_or(GraphError::FetchHintsViolation("properties"))
    }

    /// Every property named `name`, across keys and visibilities.
    fn properties_named(&self, name: &str) -> Result<Vec<&Property>> {
        ensure_property_fetched(self.view(), name)?;
        Ok(self
            .properties()?
            .iter()
            .filter(|p| p.name == name)
            .collect())
    }

    /// First property matching `(key, name)`.
    fn property(&self, key: &str, name: &str) -> Result<Option<&Property>> {
        ensure_property_fetched(self.view(), name)?;
        Ok(self
            .properties()?
            .iter()
            .find(|p| p.key == key && p.name == name))
    }

    /// Property matching `(key, name, visibility)` exactly.
    fn property_with_visibility(
        &self,
        key: &str,
        name: &str,
        visibility: &Visibility,
    ) -> Result<Option<&Property>> {
        ensure_property_fetched(self.view(), name)?;
        Ok(self
            .properties()?
            .iter()
            .find(|p| p.key == key && p.name == name && &p.visibility == visibility))
    }

    /// Value of the first property named `name`.
    fn property_value(&self, name: &str) -> Result<Option<&PropertyValue>> {
        Ok(self.properties_named(name)?.first().map(|p| &p.value))
    }

    /// Values of every property named `name`.
    fn property_values(&self, name: &str) -> Result<Vec<&PropertyValue>> {
        Ok(self
            .properties_named(name)?
            .into_iter()
            .map(|p| &p.value)
            .collect())
    }

    /// Extended data tables with at least one row readable by the caller.
    fn extended_data_table_names(&self) -> Result<&BTreeSet<String>> {
        self.view()
            .extended_tables
            .as_ref()
            .ok_or(GraphError::FetchHintsViolation("extended data tables"))
    }
}

fn ensure_property_fetched(view: &ElementView, name: &str) -> Result<()> {
    if view.hints.includes_property(name) {
        Ok(())
    } else {
        Err(GraphError::FetchHintsViolation("property"))
    }
}

/// One incident edge as seen from a vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeInfo {
    /// Edge id.
    pub edge_id: ElementId,
    /// Current edge label.
    pub label: String,
    /// Vertex at the other end.
    pub other_vertex_id: ElementId,
    /// Direction relative to the owning vertex.
    pub direction: Direction,
    /// Current edge visibility.
    pub visibility: Visibility,
    /// Whether the edge is hidden from the caller.
    pub hidden: bool,
}

/// Materialized vertex.
#[derive(Clone, Debug)]
pub struct Vertex {
    pub(crate) view: ElementView,
    pub(crate) edges: Option<Vec<EdgeInfo>>,
}

impl Element for Vertex {
    fn view(&self) -> &ElementView {
        &self.view
    }
}

impl Vertex {
    fn edges_for_refs(&self, direction: Direction) -> Result<impl Iterator<Item = &EdgeInfo>> {
        if !self.view.hints.allows_edge_refs(direction) {
            return Err(GraphError::FetchHintsViolation("edge references"));
        }
        self.loaded_edges(direction)
    }

    fn edges_for_counts(&self, direction: Direction) -> Result<impl Iterator<Item = &EdgeInfo>> {
        if !self.view.hints.allows_edge_counts(direction) {
            return Err(GraphError::FetchHintsViolation("edge labels and counts"));
        }
        self.loaded_edges(direction)
    }

    fn loaded_edges(&self, direction: Direction) -> Result<impl Iterator<Item = &EdgeInfo>> {
        let edges = self
            .edges
            .as_ref()
            .ok_or(GraphError::FetchHintsViolation("edge references"))?;
        Ok(edges
            .iter()
            .filter(move |info| direction.matches(info.direction)))
    }

    /// Incident edges in `direction`.
    pub fn edge_infos(&self, direction: Direction) -> Result<Vec<&EdgeInfo>> {
        Ok(self.edges_for_refs(direction)?.collect())
    }

    /// Incident edge ids in `direction`, deduplicated for self loops.
    pub fn edge_ids(&self, direction: Direction) -> Result<Vec<&ElementId>> {
        let ids: BTreeSet<&ElementId> = self
            .edges_for_refs(direction)?
            .map(|info| &info.edge_id)
            .collect();
        Ok(ids.into_iter().collect())
    }

    /// Ids of adjacent vertices in `direction`, one entry per edge.
    pub fn vertex_ids(&self, direction: Direction) -> Result<Vec<&ElementId>> {
        Ok(self
            .edges_for_refs(direction)?
            .map(|info| &info.other_vertex_id)
            .collect())
    }

    /// Number of incident edge references in `direction`.
    pub fn edge_count(&self, direction: Direction) -> Result<usize> {
        Ok(self.edges_for_counts(direction)?.count())
    }

    /// Distinct labels of incident edges in `direction`.
    pub fn edge_labels(&self, direction: Direction) -> Result<BTreeSet<&str>> {
        Ok(self
            .edges_for_counts(direction)?
            .map(|info| info.label.as_str())
            .collect())
    }
}

/// Materialized edge.
#[derive(Clone, Debug)]
pub struct Edge {
    pub(crate) view: ElementView,
    pub(crate) out_vertex_id: ElementId,
    pub(crate) in_vertex_id: ElementId,
    pub(crate) label: String,
}

impl Element for Edge {
    fn view(&self) -> &ElementView {
        &self.view
    }
}

impl Edge {
    /// Current label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Tail vertex id.
    pub fn out_vertex_id(&self) -> &ElementId {
        &self.out_vertex_id
    }

    /// Head vertex id.
    pub fn in_vertex_id(&self) -> &ElementId {
        &self.in_vertex_id
    }

    /// Endpoint in `direction`; `Both` is rejected.
    pub fn vertex_id(&self, direction: Direction) -> Result<&ElementId> {
        match direction {
            Direction::Out => Ok(&self.out_vertex_id),
            Direction::In => Ok(&self.in_vertex_id),
            Direction::Both => Err(GraphError::InvalidArgument(
                "edge endpoint direction must be in or out".into(),
            )),
        }
    }

    /// The endpoint opposite `vertex_id`, if `vertex_id` is an endpoint.
    pub fn other_vertex_id(&self, vertex_id: &ElementId) -> Option<&ElementId> {
        if &self.out_vertex_id == vertex_id {
            Some(&self.in_vertex_id)
        } else if &self.in_vertex_id == vertex_id {
            Some(&self.out_vertex_id)
        } else {
            None
        }
    }
}
