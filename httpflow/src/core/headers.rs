//! Ordered header collections.
//!
//! Headers are kept as an ordered list of `(name, value)` pairs. Names are
//! not normalized on insert and duplicates are allowed; lookups compare
//! names case-insensitively.

use chrono::{DateTime, Utc};

/// Format used for date-valued headers. The zone is always UTC.
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// An ordered sequence of header pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Headers<V = String> {
    entries: Vec<(String, V)>,
}

impl<V> Default for Headers<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> Headers<V> {
    /// Creates an empty header list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, keeping any existing ones with the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<V>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Appends a header only if no header with that name exists.
    ///
    /// Returns true if the header was inserted.
    pub fn put_new(&mut self, name: impl Into<String>, value: impl Into<V>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.push((name, value.into()));
        true
    }

    /// Returns the first value stored under `name`, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Returns true if a header named `name` exists, ignoring case.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes every header named `name`, ignoring case.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Iterates over the pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Returns the header names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Returns the number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrites every pair through `f`, preserving order.
    #[must_use]
    pub fn map<W>(self, mut f: impl FnMut(String, V) -> (String, W)) -> Headers<W> {
        Headers {
            entries: self.entries.into_iter().map(|(n, v)| f(n, v)).collect(),
        }
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for Headers<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<V> IntoIterator for Headers<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Headers<String> {
    /// Returns the first value for `name` as a string slice.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// A request header value that may still need encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// Already a wire string.
    Text(String),
    /// A timestamp, encoded as an HTTP-date.
    Date(DateTime<Utc>),
    /// Any other value, encoded through its string form.
    Value(serde_json::Value),
}

impl HeaderValue {
    /// Encodes the value as a header string.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Date(dt) => dt.format(HTTP_DATE_FORMAT).to_string(),
            Self::Value(serde_json::Value::String(s)) => s.clone(),
            Self::Value(other) => other.to_string(),
        }
    }

    /// Returns the text if the value is already encoded.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for HeaderValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        Self::Value(value.into())
    }
}

impl From<u64> for HeaderValue {
    fn from(value: u64) -> Self {
        Self::Value(value.into())
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        Self::Value(value.into())
    }
}

impl From<serde_json::Value> for HeaderValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}
