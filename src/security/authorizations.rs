#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::visibility::Visibility;

/// Immutable set of labels granted to one caller.
///
/// Cloning is cheap; the label set is shared. Label comparison is
/// case-sensitive.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Authorizations {
    labels: Arc<BTreeSet<String>>,
}

impl Authorizations {
    /// Builds an authorization set from any collection of labels.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: Arc::new(labels.into_iter().map(Into::into).collect()),
        }
    }

    /// An authorization set holding no labels; it reads only the empty visibility.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` when `label` has been granted.
    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Returns `true` when `visibility` evaluates to true for this set.
    pub fn can_read(&self, visibility: &Visibility) -> bool {
        visibility.evaluate(self)
    }

    /// Iterates the granted labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Number of granted labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` when no labels are granted.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl fmt::Debug for Authorizations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.labels.iter()).finish()
    }
}
