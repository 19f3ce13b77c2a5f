//! Cellgraph: a visibility-labelled, append-only property graph core.
//!
//! Every vertex, edge and extended-data row is stored as a log of timestamped
//! mutations. Reads fold those logs into views for one caller: a
//! [`security::Visibility`] expression decides what each set of
//! [`security::Authorizations`] may see, [`model::FetchHints`] decide how much
//! is materialized, and an optional as-of timestamp turns any read into a
//! historical one. Backends plug in through [`storage::StorageAdapter`].

#![warn(missing_docs)]

pub mod error;
pub mod graph;
pub mod model;
pub mod reconstruct;
pub mod security;
pub mod storage;
pub mod streaming;
pub mod types;
pub mod value;

pub use error::{GraphError, Result, StorageError};
pub use graph::{ElementMutation, Graph, GraphEvent, GraphEventListener, GraphOptions};
pub use model::{Edge, Element, FetchHints, HistoryQuery, Metadata, Vertex};
pub use reconstruct::{ElementStateReconstructor, ReadContext};
pub use security::{Authorizations, Visibility};
pub use storage::{InMemoryStorage, StorageAdapter};
pub use streaming::{StreamingPropertyValue, StreamingValue, StreamingValueRef};
pub use types::{Direction, ElementId, ElementType, Timestamp};
pub use value::PropertyValue;
