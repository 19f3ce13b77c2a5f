use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::ElementType;

/// Hooks for counting graph operations.
///
/// A handle is injected through [`crate::graph::GraphOptions`]; nothing in the
/// crate records metrics into process-global state.
pub trait GraphMetrics: Send + Sync {
    /// Records a durably appended batch of `count` mutations.
    fn mutations_appended(&self, element_type: ElementType, count: usize);

    /// Records one element reconstruction.
    ///
    /// # Parameters
    /// * `element_type` - What was reconstructed.
    /// * `found` - Whether the caller received a view (`false` for absent,
    ///   deleted, unreadable or hidden elements).
    fn element_reconstructed(&self, element_type: ElementType, found: bool);

    /// Records a history scan that produced `entries` values.
    fn history_scanned(&self, entries: usize);

    /// Records a streaming value fetched from the backend.
    fn streaming_fetch(&self, bytes: u64);
}

/// A no-op implementation of [`GraphMetrics`] that discards all recorded metrics.
#[derive(Default)]
pub struct NoopMetrics;

impl GraphMetrics for NoopMetrics {
    fn mutations_appended(&self, _element_type: ElementType, _count: usize) {}
    fn element_reconstructed(&self, _element_type: ElementType, _found: bool) {}
    fn history_scanned(&self, _entries: usize) {}
    fn streaming_fetch(&self, _bytes: u64) {}
}

/// A thread-safe counter-based implementation of [`GraphMetrics`].
///
/// All counters are relaxed atomics and can be read while writers run.
#[derive(Default)]
pub struct CounterMetrics {
    /// Mutations appended to vertex logs.
    pub vertex_mutations: AtomicU64,

    /// Mutations appended to edge logs.
    pub edge_mutations: AtomicU64,

    /// Append batches.
    pub batches: AtomicU64,

    /// Reconstructions that returned a view.
    pub reconstructions_found: AtomicU64,

    /// Reconstructions that returned nothing.
    pub reconstructions_missing: AtomicU64,

    /// History scans.
    pub history_scans: AtomicU64,

    /// Historical values returned.
    pub history_entries: AtomicU64,

    /// Streaming values fetched.
    pub streaming_fetches: AtomicU64,

    /// Streaming bytes fetched.
    pub streaming_bytes: AtomicU64,
}

impl GraphMetrics for CounterMetrics {
    fn mutations_appended(&self, element_type: ElementType, count: usize) {
        let counter = match element_type {
            ElementType::Vertex => &self.vertex_mutations,
            ElementType::Edge => &self.edge_mutations,
        };
        counter.fetch_add(count as u64, Ordering::Relaxed);
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    fn element_reconstructed(&self, _element_type: ElementType, found: bool) {
        if found {
            self.reconstructions_found.fetch_add(1, Ordering::Relaxed);
        } else {
            self.reconstructions_missing.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn history_scanned(&self, entries: usize) {
        self.history_scans.fetch_add(1, Ordering::Relaxed);
        self.history_entries
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    fn streaming_fetch(&self, bytes: u64) {
        self.streaming_fetches.fetch_add(1, Ordering::Relaxed);
        self.streaming_bytes.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation wrapped in an [`Arc`].
///
/// The default implementation is [`NoopMetrics`].
pub fn default_metrics() -> Arc<dyn GraphMetrics> {
    Arc::new(NoopMetrics::default())
}
