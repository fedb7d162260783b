//! Backend capabilities the cache layer consumes.
//!
//! A mounted backend declares which of its sub-paths take part in
//! conditional-request caching and, optionally, how to fingerprint requests
//! on them. The declaration is compiled into a [`CachePathIndex`] and
//! published through the backend-owned [`CacheablePaths`] cell; the router
//! only ever reads it.
//!
//! ## Pattern syntax
//!
//! | Pattern        | Marker             | Cacheable paths                  |
//! |----------------|--------------------|----------------------------------|
//! | `config`       | [`CacheMarker::Exact`]  | `config` only              |
//! | `data/*`       | [`CacheMarker::Prefix`] | `data/` and everything beneath |
//! | `creds*`       | [`CacheMarker::Prefix`] | anything starting with `creds` |
//!
//! The *key* of a pattern is the pattern with its trailing `*` removed; it
//! is also the name custom fingerprint functions are registered under.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::http::Request;
use crate::router::PrefixIndex;

/// Derives a fingerprint for the resource a request touches.
pub type FingerprintFn = Arc<dyn Fn(&Request) -> String + Send + Sync + 'static>;

/// The fallback fingerprint: the request's unique id.
pub fn default_fingerprint(req: &Request) -> String {
    req.id().to_owned()
}

/// Returns [`default_fingerprint`] as a [`FingerprintFn`].
pub fn default_fingerprint_fn() -> FingerprintFn {
    Arc::new(default_fingerprint)
}

/// How a cacheable-path key applies to concrete paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMarker {
    /// Only the key itself is cacheable.
    Exact,
    /// The key and every path that starts with it are cacheable.
    Prefix,
}

impl CacheMarker {
    /// Splits a declared pattern into its key and marker.
    pub fn parse(pattern: &str) -> (String, CacheMarker) {
        let pattern = pattern.trim_start_matches('/');
        match pattern.strip_suffix('*') {
            Some(key) => (key.to_owned(), CacheMarker::Prefix),
            None => (pattern.to_owned(), CacheMarker::Exact),
        }
    }
}

/// Immutable snapshot of a backend's cacheable paths.
#[derive(Debug, Clone, Default)]
pub struct CachePathIndex {
    markers: PrefixIndex<CacheMarker>,
}

impl CachePathIndex {
    /// Compiles a list of patterns.
    ///
    /// When the same key is declared both exactly and as a prefix, the prefix
    /// declaration wins since it covers the exact one.
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut markers = PrefixIndex::new();
        for pattern in patterns {
            let (key, marker) = CacheMarker::parse(pattern.as_ref());
            match markers.get_mut(&key) {
                Some(existing) if *existing == CacheMarker::Prefix => {}
                Some(existing) => *existing = marker,
                None => {
                    markers.insert(key, marker);
                }
            }
        }
        Self { markers }
    }

    /// Resolves `remainder` (a path relative to the mount point) to the key
    /// that governs it, or `None` if the path is not cacheable.
    ///
    /// Only the longest matching key is consulted: an exact key that is a
    /// strict prefix of `remainder` makes it uncacheable even when a shorter
    /// prefix key would have covered it.
    pub fn lookup<'a>(&'a self, remainder: &str) -> Option<&'a str> {
        let (key, marker) = self.markers.longest_prefix(remainder)?;
        let cacheable = match marker {
            CacheMarker::Exact => key == remainder,
            CacheMarker::Prefix => true,
        };
        cacheable.then_some(key)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Backend-owned cell holding the current [`CachePathIndex`] snapshot.
///
/// Readers load a whole snapshot without locking; writers replace it
/// wholesale, so a reader sees either the old index or the new one, never a
/// mix.
#[derive(Debug, Default)]
pub struct CacheablePaths {
    current: ArcSwap<CachePathIndex>,
}

impl CacheablePaths {
    pub fn new(index: CachePathIndex) -> Self {
        Self {
            current: ArcSwap::from_pointee(index),
        }
    }

    /// Compiles `patterns` and swaps the result in.
    pub fn publish<I, S>(&self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.current
            .store(Arc::new(CachePathIndex::from_patterns(patterns)));
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<CachePathIndex> {
        self.current.load_full()
    }
}

/// The view of a mounted backend the cache layer needs.
pub trait Backend: Send + Sync {
    /// Human-readable backend type, used in logs.
    fn kind(&self) -> &str;

    /// The backend's cacheable-path declarations.
    fn cacheable_paths(&self) -> &CacheablePaths;

    /// Custom fingerprint function registered for the cacheable-path `key`.
    fn fingerprint_fn(&self, _key: &str) -> Option<FingerprintFn> {
        None
    }
}

/// A backend defined entirely by its declarations.
///
/// Useful for backends whose cacheable paths are static, and in tests.
///
/// # Examples
///
/// ```
/// use condcache::backend::{Backend, SimpleBackend};
///
/// let backend = SimpleBackend::new("kv")
///     .cacheable("data/*")
///     .cacheable_with("config", |req| format!("cfg-{}", req.path()))
///     .build();
///
/// let index = backend.cacheable_paths().snapshot();
/// assert_eq!(index.lookup("data/app"), Some("data/"));
/// assert_eq!(index.lookup("config"), Some("config"));
/// assert_eq!(index.lookup("config/extra"), None);
/// assert!(backend.fingerprint_fn("config").is_some());
/// ```
pub struct SimpleBackend {
    kind: String,
    patterns: Vec<String>,
    fingerprints: HashMap<String, FingerprintFn>,
    paths: CacheablePaths,
}

impl SimpleBackend {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            patterns: Vec::new(),
            fingerprints: HashMap::new(),
            paths: CacheablePaths::default(),
        }
    }

    /// Declares a cacheable pattern.
    #[must_use]
    pub fn cacheable(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Declares a cacheable pattern with a custom fingerprint function.
    #[must_use]
    pub fn cacheable_with<F>(mut self, pattern: impl Into<String>, fingerprint: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        let pattern = pattern.into();
        let (key, _) = CacheMarker::parse(&pattern);
        self.fingerprints.insert(key, Arc::new(fingerprint));
        self.patterns.push(pattern);
        self
    }

    /// Publishes the declared patterns and returns the finished backend.
    pub fn build(self) -> Self {
        self.paths.publish(&self.patterns);
        self
    }

    /// Replaces the declared patterns and republishes the index.
    pub fn redeclare<I, S>(&self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.paths.publish(patterns);
    }
}

impl Backend for SimpleBackend {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn cacheable_paths(&self) -> &CacheablePaths {
        &self.paths
    }

    fn fingerprint_fn(&self, key: &str) -> Option<FingerprintFn> {
        self.fingerprints.get(key).cloned()
    }
}
