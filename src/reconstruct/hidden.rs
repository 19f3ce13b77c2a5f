#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::security::{Authorizations, Visibility};

/// Per hide-visibility hidden flags; the latest mark for a visibility wins.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct HiddenMarks {
    marks: BTreeMap<Visibility, bool>,
}

impl HiddenMarks {
    pub(crate) fn mark(&mut self, hide_visibility: &Visibility, hidden: bool) {
        self.marks.insert(hide_visibility.clone(), hidden);
    }

    /// Hide visibilities currently hiding the datum from `auths`.
    ///
    /// A datum hidden under a visibility the caller cannot read is not hidden
    /// from that caller.
    pub(crate) fn hidden_for(&self, auths: &Authorizations) -> SmallVec<[Visibility; 2]> {
        self.marks
            .iter()
            .filter(|(visibility, hidden)| **hidden && auths.can_read(visibility))
            .map(|(visibility, _)| visibility.clone())
            .collect()
    }

    pub(crate) fn is_hidden_for(&self, auths: &Authorizations) -> bool {
        self.marks
            .iter()
            .any(|(visibility, hidden)| *hidden && auths.can_read(visibility))
    }
}
