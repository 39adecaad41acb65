//! The normalized error record handed to the reporting sink.
//!
//! An [`ErrorRecord`] is created transiently for a single failing call and is
//! not retained by this crate once it has been passed to the sink. Contextual
//! key/value data is merged into the record in named groups so that
//! parameters from different sources cannot collide.

use alloc::string::String;
use core::fmt;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::fault::FaultKind;

type Map<K, V> = IndexMap<K, V, FxBuildHasher>;

/// An ordered key/value parameter set.
///
/// Insertion order is preserved, so merged parameters render in a stable
/// order. This is the minimal shape required by the merge contract; the
/// host's full record type remains external to this crate.
///
/// # Examples
///
/// ```
/// use faultline::params;
///
/// let params = params! {
///     "request_id" => "42",
///     "route" => "/checkout",
/// };
/// assert_eq!(params.get("route"), Some("/checkout"));
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    entries: Map<String, String>,
}

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a key/value pair, returning the previous value for the key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Looks up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// The number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the set holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Folds another parameter set into this one; later keys win.
    pub fn merge(&mut self, other: Params) {
        for (key, value) in other.entries {
            self.entries.insert(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        params.extend(iter);
        params
    }
}

impl<K, V> Extend<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

/// The normalized, reportable representation of one captured failure.
///
/// Holds the failure's kind, message, and formatted trace text, plus any
/// parameter groups merged in before the record reaches the sink. Records
/// are value types: the reporting sink takes ownership and this crate keeps
/// nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorRecord {
    kind: FaultKind,
    message: String,
    stack_trace: String,
    params: Map<String, Params>,
}

impl ErrorRecord {
    /// Creates a record from normalized failure data.
    #[must_use]
    pub fn new(
        kind: FaultKind,
        message: impl Into<String>,
        stack_trace: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            stack_trace: stack_trace.into(),
            params: Map::default(),
        }
    }

    /// The failure's kind.
    #[must_use]
    pub fn kind(&self) -> &FaultKind {
        &self.kind
    }

    /// The failure's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The formatted trace text produced by
    /// [`normalize::format_fault`](crate::normalize::format_fault).
    #[must_use]
    pub fn stack_trace(&self) -> &str {
        &self.stack_trace
    }

    /// Folds key/value data into the record under a namespace label.
    ///
    /// Namespaces keep parameters from different sources apart. Merging the
    /// same namespace twice extends the existing group, with later keys
    /// overwriting earlier ones.
    ///
    /// # Examples
    ///
    /// ```
    /// use faultline::{params, ErrorRecord, FaultKind};
    ///
    /// let mut record = ErrorRecord::new(FaultKind::from_static("IoError"), "closed", "");
    /// record.merge_params("request", params! { "route" => "/checkout" });
    /// record.merge_params("request", params! { "verb" => "POST" });
    ///
    /// let request = record.params("request").unwrap();
    /// assert_eq!(request.get("route"), Some("/checkout"));
    /// assert_eq!(request.get("verb"), Some("POST"));
    /// ```
    pub fn merge_params(&mut self, namespace: impl Into<String>, params: Params) {
        self.params
            .entry(namespace.into())
            .or_default()
            .merge(params);
    }

    /// The parameter group merged under `namespace`, if any.
    #[must_use]
    pub fn params(&self, namespace: &str) -> Option<&Params> {
        self.params.get(namespace)
    }

    /// Iterates the namespace labels in merge order.
    pub fn param_namespaces(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            fmt::Display::fmt(&self.kind, f)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn params_preserve_insertion_order() {
        let mut params = Params::new();
        params.insert("b", "2");
        params.insert("a", "1");
        params.insert("c", "3");

        let keys: Vec<&str> = params.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn merge_overwrites_and_appends() {
        let mut params: Params = [("a", "1"), ("b", "2")].into_iter().collect();
        params.merge([("b", "20"), ("c", "3")].into_iter().collect());

        assert_eq!(params.get("a"), Some("1"));
        assert_eq!(params.get("b"), Some("20"));
        assert_eq!(params.get("c"), Some("3"));
    }

    #[test]
    fn record_namespaces_are_isolated() {
        let mut record = ErrorRecord::new(FaultKind::from_static("IoError"), "closed", "");
        record.merge_params("request", [("id", "1")].into_iter().collect());
        record.merge_params("transaction", [("id", "2")].into_iter().collect());

        assert_eq!(record.params("request").unwrap().get("id"), Some("1"));
        assert_eq!(record.params("transaction").unwrap().get("id"), Some("2"));
        let namespaces: Vec<&str> = record.param_namespaces().collect();
        assert_eq!(namespaces, ["request", "transaction"]);
    }
}
