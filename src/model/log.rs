#![forbid(unsafe_code)]

use crate::types::Timestamp;

use super::mutation::{ExtendedDataMutation, Mutation};

/// A mutation stamped with its commit time.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry<M> {
    /// Commit timestamp.
    pub timestamp: Timestamp,
    /// The change itself.
    pub mutation: M,
}

impl<M> LogEntry<M> {
    /// Pairs a mutation with its timestamp.
    pub fn new(timestamp: Timestamp, mutation: M) -> Self {
        Self {
            timestamp,
            mutation,
        }
    }
}

/// Append-only, time-ordered sequence of mutations owned by one element or row.
///
/// Entries are kept in append order. Readers fold them in timestamp order with
/// ties broken by append position, so a batch appended with an explicit older
/// timestamp still lands at its temporal position.
#[derive(Clone, Debug, PartialEq)]
pub struct Log<M> {
    entries: Vec<LogEntry<M>>,
}

/// Log of an element.
pub type MutationLog = Log<Mutation>;

/// Log of an extended-data row.
pub type ExtendedDataLog = Log<ExtendedDataMutation>;

impl<M> Default for Log<M> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<M> Log<M> {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry.
    pub fn append(&mut self, entry: LogEntry<M>) {
        self.entries.push(entry);
    }

    /// Appends a batch, preserving its order.
    pub fn extend(&mut self, batch: impl IntoIterator<Item = LogEntry<M>>) {
        self.entries.extend(batch);
    }

    /// Entries in append order.
    pub fn entries(&self) -> &[LogEntry<M>] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest timestamp in the log.
    pub fn latest_timestamp(&self) -> Option<Timestamp> {
        self.entries.iter().map(|entry| entry.timestamp).max()
    }

    /// Entries with `timestamp <= as_of`, in timestamp order (stable on append order).
    pub fn ordered_as_of(&self, as_of: Timestamp) -> Vec<&LogEntry<M>> {
        let mut ordered: Vec<&LogEntry<M>> = self
            .entries
            .iter()
            .filter(|entry| entry.timestamp <= as_of)
            .collect();
        ordered.sort_by_key(|entry| entry.timestamp);
        ordered
    }

    /// All entries in timestamp order.
    pub fn ordered(&self) -> Vec<&LogEntry<M>> {
        self.ordered_as_of(Timestamp::MAX)
    }
}

impl<M> FromIterator<LogEntry<M>> for Log<M> {
    fn from_iter<I: IntoIterator<Item = LogEntry<M>>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
