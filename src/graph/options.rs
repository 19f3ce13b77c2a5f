use std::sync::Arc;

use crate::model::FetchHints;
use crate::storage::{GraphMetrics, StorageAdapter};
use crate::streaming::DEFAULT_SPOOL_THRESHOLD;

/// Default limit for inline `Str`/`Bytes` property values.
pub const DEFAULT_MAX_INLINE_VALUE_LEN: usize = 64 * 1024;

/// Configuration options supplied when opening a [`super::Graph`].
#[derive(Clone)]
pub struct GraphOptions {
    /// The storage adapter hosting logs, rows and blobs
    pub storage: Arc<dyn StorageAdapter>,
    /// Optional metrics collection implementation
    pub metrics: Option<Arc<dyn GraphMetrics>>,
    /// Hints used by [`super::Graph::read_context`]
    pub default_fetch_hints: FetchHints,
    /// Resolved streams longer than this are spooled to a temporary file
    pub streaming_spool_threshold: usize,
    /// `Str`/`Bytes` values longer than this are stored out of line; `None` keeps every value inline
    pub max_inline_value_len: Option<usize>,
    /// Reject writes whose visibilities the writer cannot read
    pub strict_write_visibility: bool,
}

impl GraphOptions {
    /// Creates a new GraphOptions with default settings.
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            storage,
            metrics: None,
            default_fetch_hints: FetchHints::default(),
            streaming_spool_threshold: DEFAULT_SPOOL_THRESHOLD,
            max_inline_value_len: Some(DEFAULT_MAX_INLINE_VALUE_LEN),
            strict_write_visibility: false,
        }
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn GraphMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sets the hints used when a caller does not supply any.
    pub fn default_fetch_hints(mut self, hints: FetchHints) -> Self {
        self.default_fetch_hints = hints;
        self
    }

    /// Sets the in-memory limit for resolved streaming values.
    pub fn streaming_spool_threshold(mut self, bytes: usize) -> Self {
        self.streaming_spool_threshold = bytes;
        self
    }

    /// Sets the maximum inline value size; `None` disables spilling.
    pub fn max_inline_value_len(mut self, bytes: Option<usize>) -> Self {
        self.max_inline_value_len = bytes;
        self
    }

    /// Enables or disables write-side visibility checks.
    pub fn strict_write_visibility(mut self, enabled: bool) -> Self {
        self.strict_write_visibility = enabled;
        self
    }
}
