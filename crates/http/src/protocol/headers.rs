//! Case-insensitive, order-preserving, multi-valued header map.
//!
//! HTTP header names are compared without regard to case, but the casing a
//! peer sent (or the casing an application chose) is worth keeping for
//! display and serialization. [`Headers`] therefore stores the first-seen
//! spelling of every name and compares lookups case-insensitively, while
//! repeated header lines for one name accumulate as an ordered value list
//! instead of being comma-joined.

use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

/// A header field name that remembers its original spelling.
///
/// Equality and hashing are case-insensitive; `Display` yields the spelling
/// the name was created with.
#[derive(Debug, Clone)]
pub struct HeaderName {
    name: String,
}

impl HeaderName {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The name as originally spelled.
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl PartialEq for HeaderName {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for HeaderName {}

impl PartialEq<str> for HeaderName {
    fn eq(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }
}

impl Hash for HeaderName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.name.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl Display for HeaderName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for HeaderName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for HeaderName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    name: HeaderName,
    values: Vec<String>,
}

/// An ordered multi-map of header fields.
///
/// Names keep their first-seen casing and are matched case-insensitively on
/// every operation. Each name owns an ordered list of values, one per header
/// line that carried the name; [`Headers::append`] never overwrites.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<Entry>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.name == *name)
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|entry| entry.name == *name)
    }

    /// Adds a value for `name`, merging into the existing value list if the
    /// name is already present under any casing.
    pub fn append(&mut self, name: impl Into<HeaderName>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entry_mut(name.as_str()) {
            Some(entry) => entry.values.push(value),
            None => self.entries.push(Entry { name, values: vec![value] }),
        }
    }

    /// Replaces all values for `name` with the single given value.
    ///
    /// The first-seen casing of an existing entry is retained.
    pub fn set(&mut self, name: impl Into<HeaderName>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entry_mut(name.as_str()) {
            Some(entry) => {
                entry.values.clear();
                entry.values.push(value);
            }
            None => self.entries.push(Entry { name, values: vec![value] }),
        }
    }

    /// The first value stored for `name`, under any casing.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entry(name).and_then(|entry| entry.values.first()).map(String::as_str)
    }

    /// All values stored for `name`, in the order their lines arrived.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entry(name).map(|entry| entry.values.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Removes `name` and returns its value list, if present.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        let position = self.entries.iter().position(|entry| entry.name == *name)?;
        Some(self.entries.remove(position).values)
    }

    /// All values for `name` joined with `", "`, or `None` when absent.
    pub fn merged(&self, name: &str) -> Option<String> {
        self.entry(name).map(|entry| entry.values.join(", "))
    }

    /// Iterates `(name, value)` pairs: names in insertion order, repeated
    /// names yielding one pair per stored value.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &str)> {
        self.entries
            .iter()
            .flat_map(|entry| entry.values.iter().map(move |value| (&entry.name, value.as_str())))
    }
}

impl PartialEq for Headers {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<N: Into<HeaderName>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}
