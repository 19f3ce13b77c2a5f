//! Error types returned by graph and storage operations.

use std::io;

use thiserror::Error;

use crate::types::{ElementId, ElementType};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors surfaced by the graph core.
///
/// Unreadable data is reported as absence (`None`) by read paths; the variants
/// here cover caller misuse, explicit security checks and storage failures.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A visibility expression could not be parsed.
    #[error("malformed visibility '{expression}' at {position}: {reason}")]
    MalformedVisibility {
        /// Expression as supplied by the caller.
        expression: String,
        /// Byte offset where parsing failed.
        position: usize,
        /// What was wrong at that offset.
        reason: &'static str,
    },
    /// The caller's authorizations cannot read a visibility the operation requires.
    #[error("security violation: {0}")]
    Security(String),
    /// Data outside the requested fetch hints was accessed.
    #[error("fetch hints do not include {0}")]
    FetchHintsViolation(&'static str),
    /// The storage adapter failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The element does not exist or is not visible at the requested time.
    #[error("{element_type} '{id}' not found")]
    NotFound {
        /// Namespace of the missing element.
        element_type: ElementType,
        /// Requested id.
        id: ElementId,
    },
    /// The caller supplied an inconsistent mutation or argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl GraphError {
    pub(crate) fn not_found(element_type: ElementType, id: &ElementId) -> Self {
        GraphError::NotFound {
            element_type,
            id: id.clone(),
        }
    }
}

/// Failures raised at the storage adapter boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Persisted bytes could not be decoded.
    #[error("corruption detected: {0}")]
    Corruption(&'static str),
    /// A checksummed payload did not match its recorded checksum.
    #[error("checksum mismatch (expected {expected:#010x}, got {actual:#010x})")]
    ChecksumMismatch {
        /// Checksum recorded when the payload was written.
        expected: u32,
        /// Checksum of the bytes actually read.
        actual: u32,
    },
    /// Backend specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<io::Error> for GraphError {
    fn from(err: io::Error) -> Self {
        GraphError::Storage(StorageError::Io(err))
    }
}
