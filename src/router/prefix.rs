//! Ordered string-keyed map with longest-prefix lookup.

use std::collections::BTreeMap;

/// A map from string prefixes to values, answering "which stored key is the
/// longest prefix of this path?".
///
/// Lookups probe each char boundary of the query from longest to shortest,
/// so their cost depends on the query length, not on the number of entries.
///
/// # Examples
///
/// ```
/// use condcache::router::PrefixIndex;
///
/// let mut index = PrefixIndex::new();
/// index.insert("secret/", 1);
/// index.insert("secret/app/", 2);
///
/// assert_eq!(index.longest_prefix("secret/app/db"), Some(("secret/app/", &2)));
/// assert_eq!(index.longest_prefix("secret/other"), Some(("secret/", &1)));
/// assert_eq!(index.longest_prefix("sys/health"), None);
/// ```
#[derive(Debug, Clone)]
pub struct PrefixIndex<V> {
    entries: BTreeMap<String, V>,
}

impl<V> Default for PrefixIndex<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> PrefixIndex<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` at `key`, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    /// Returns the entry whose key is the longest prefix of `path`.
    pub fn longest_prefix<'a>(&'a self, path: &str) -> Option<(&'a str, &'a V)> {
        path.char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(path.len()))
            .rev()
            .find_map(|end| self.entries.get_key_value(&path[..end]))
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for PrefixIndex<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
