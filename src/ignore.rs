//! Suppression filters for error reporting.

use hashbrown::HashSet;
use rustc_hash::FxBuildHasher;

use crate::fault::FaultKind;

/// A set of error kinds whose occurrence is not reported.
///
/// An ignore list suppresses only the reporting side effect: a matching
/// failure still propagates to the caller unchanged. Lists are immutable
/// once attached to a wrapper or decorator; an empty list means no
/// filtering.
///
/// Matching is by exact kind equality. Kinds are opaque identifiers here,
/// so any hierarchy among the host's error classes must be flattened into
/// the list by whoever builds it.
///
/// # Examples
///
/// ```
/// use faultline::{FaultKind, IgnoreList};
///
/// let ignore: IgnoreList = [FaultKind::from_static("KeyError")].into_iter().collect();
/// assert!(ignore.contains(&FaultKind::new("KeyError")));
/// assert!(!ignore.contains(&FaultKind::new("ValueError")));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IgnoreList {
    kinds: HashSet<FaultKind, FxBuildHasher>,
}

impl IgnoreList {
    /// Creates an empty list (no filtering).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `kind` is suppressed by this list.
    #[must_use]
    pub fn contains(&self, kind: &FaultKind) -> bool {
        self.kinds.contains(kind)
    }

    /// Returns `true` if the list suppresses nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// The number of suppressed kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }
}

impl<K: Into<FaultKind>> FromIterator<K> for IgnoreList {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self {
            kinds: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_suppresses_nothing() {
        let ignore = IgnoreList::new();
        assert!(ignore.is_empty());
        assert!(!ignore.contains(&FaultKind::from_static("ValueError")));
    }

    #[test]
    fn matching_is_exact() {
        let ignore: IgnoreList = ["KeyError"].into_iter().collect();
        assert!(ignore.contains(&FaultKind::from_static("KeyError")));
        assert!(!ignore.contains(&FaultKind::from_static("keyerror")));
        assert!(!ignore.contains(&FaultKind::from_static("KeyErrorSubclass")));
    }
}
