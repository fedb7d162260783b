//! Case-insensitive request/response header map and the precondition
//! header names the cache layer understands.

pub const IF_MATCH: &str = "If-Match";
pub const IF_NONE_MATCH: &str = "If-None-Match";
pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";
pub const IF_UNMODIFIED_SINCE: &str = "If-Unmodified-Since";
pub const ETAG: &str = "Etag";

/// A case-insensitive, multi-value header map.
///
/// Insertion order is preserved and a name may carry several values, as
/// HTTP/1.1 header fields do (RFC 9110 §5.3).
///
/// # Examples
///
/// ```
/// use condcache::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("If-None-Match", "\"a\", \"b\"");
/// headers.insert("if-none-match", "\"c\"");
///
/// let tags: Vec<_> = headers.list_values("IF-NONE-MATCH").collect();
/// assert_eq!(tags, vec!["\"a\"", "\"b\"", "\"c\""]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header entry. Multiple values for the same name are preserved.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the first value for `name`, or `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).next()
    }

    /// Returns every raw value recorded for `name`.
    pub fn get_all<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
        self.inner
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the comma-separated list members of every value for `name`,
    /// trimmed, with empty members dropped.
    ///
    /// Only meaningful for list-valued fields such as `If-Match`; date
    /// fields contain commas of their own and must be read with [`get`](Self::get).
    pub fn list_values<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
        self.get_all(name)
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Removes all entries named `name`. Returns `true` if any were removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.inner.len();
        self.inner.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.inner.len() < before
    }

    /// Returns `true` if at least one entry is named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over all `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut h = Headers::new();
        h.insert("If-Match", "\"x\"");
        assert_eq!(h.get("if-match"), Some("\"x\""));
        assert_eq!(h.get(IF_MATCH), Some("\"x\""));
        assert!(h.contains("IF-MATCH"));
        assert!(!h.contains(IF_NONE_MATCH));
    }

    #[test]
    fn list_values_splits_and_trims() {
        let h: Headers = [(IF_MATCH, " \"a\" ,, W/\"b\""), ("if-match", "*")]
            .into_iter()
            .collect();
        let vals: Vec<_> = h.list_values(IF_MATCH).collect();
        assert_eq!(vals, vec!["\"a\"", "W/\"b\"", "*"]);
    }

    #[test]
    fn date_values_are_not_split_by_get() {
        let mut h = Headers::new();
        h.insert(IF_MODIFIED_SINCE, "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(h.get(IF_MODIFIED_SINCE), Some("Sun, 06 Nov 1994 08:49:37 GMT"));
    }

    #[test]
    fn values_outlive_the_name_they_were_looked_up_by() {
        let h: Headers = [(IF_NONE_MATCH, "\"a\", \"b\"")].into_iter().collect();
        let first = {
            let name = String::from("if-none-match");
            h.get(&name)
        };
        let tags: Vec<&str> = {
            let name = IF_NONE_MATCH.to_ascii_uppercase();
            h.list_values(&name).collect()
        };
        assert_eq!(first, Some("\"a\", \"b\""));
        assert_eq!(tags, vec!["\"a\"", "\"b\""]);
    }

    #[test]
    fn remove_drops_every_value() {
        let mut h = Headers::new();
        h.insert(ETAG, "\"a\"");
        h.insert("etag", "\"b\"");
        assert!(h.remove("ETag"));
        assert!(h.is_empty());
        assert!(!h.remove("ETag"));
    }
}
