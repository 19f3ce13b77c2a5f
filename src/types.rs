#![forbid(unsafe_code)]

//! Identifiers and scalar types shared across the crate.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Identifier of a vertex or edge.
///
/// Ids are opaque strings ordered lexically, which is what prefix and range
/// scans over a storage adapter operate on.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ElementId(String);

impl ElementId {
    /// Creates an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the id begins with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Distinguishes the vertex and edge id namespaces.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// A vertex.
    Vertex,
    /// An edge.
    Edge,
}

impl ElementType {
    pub(crate) fn tag(self) -> u8 {
        match self {
            ElementType::Vertex => 1,
            ElementType::Edge => 2,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ElementType::Vertex),
            2 => Some(ElementType::Edge),
            _ => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Vertex => f.write_str("vertex"),
            ElementType::Edge => f.write_str("edge"),
        }
    }
}

/// Commit timestamp in milliseconds since the Unix epoch.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Largest representable timestamp; reads "as of" it see the whole log.
    pub const MAX: Timestamp = Timestamp(u64::MAX);

    /// Wall-clock time in milliseconds.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(millis)
    }

    /// Returns the raw millisecond value.
    pub const fn millis(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Timestamp(value)
    }
}

/// Direction of an edge relative to one of its vertices.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Edges pointing into the vertex.
    In,
    /// Edges leaving the vertex.
    Out,
    /// Both directions.
    Both,
}

impl Direction {
    /// Returns `true` when an edge stored with direction `stored` matches this filter.
    pub fn matches(self, stored: Direction) -> bool {
        match self {
            Direction::Both => true,
            other => other == stored,
        }
    }

    pub(crate) fn tag(self) -> u8 {
        match self {
            Direction::In => 1,
            Direction::Out => 2,
            Direction::Both => 3,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Direction::In),
            2 => Some(Direction::Out),
            3 => Some(Direction::Both),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => f.write_str("in"),
            Direction::Out => f.write_str("out"),
            Direction::Both => f.write_str("both"),
        }
    }
}
