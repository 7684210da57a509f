//! Immutable string set shared across course tasks
//!
//! The set is built once before downloads start and only read afterwards, so
//! it needs no locking; clones share the same storage.

use std::collections::HashSet;
use std::sync::Arc;

/// Read-only set of strings, cheap to clone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringSet {
    inner: Arc<HashSet<String>>,
}

impl StringSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_elements<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        elements.into_iter().map(Into::<String>::into).collect()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.inner.contains(value)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Members in lexical order, for display
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut values: Vec<String> = self.inner.iter().cloned().collect();
        values.sort();
        values
    }
}

impl FromIterator<String> for StringSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            inner: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl<'a> FromIterator<&'a str> for StringSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}
