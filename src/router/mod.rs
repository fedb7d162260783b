//! Mount table and cacheability resolution.
//!
//! The [`Router`] maps mount points to backends. Mount points are full,
//! namespace-adjusted prefixes such as `secret/` or `team-a/kv/`; a request
//! path is resolved by prefixing it with the caller's namespace path and
//! taking the longest mount that prefixes the result.
//!
//! | Step | Input                         | Lookup                               |
//! |------|-------------------------------|--------------------------------------|
//! | 1    | context                       | namespace (missing → not cacheable)  |
//! | 2    | `ns.path + path`              | longest mount prefix (read lock)     |
//! | 3    | remainder after the mount     | backend's index snapshot (lock-free) |
//! | 4    | matched cacheable-path key    | backend fingerprint fn, or default   |
//!
//! Cacheability is best-effort: every failure along the way means "not
//! cacheable" and never an error.

mod prefix;

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, trace};

pub use prefix::PrefixIndex;

use crate::backend::{Backend, FingerprintFn, default_fingerprint_fn};
use crate::context::Context;
use crate::namespace;

/// Errors produced by mount-table mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("path is already in use at {0}")]
    AlreadyMounted(String),

    #[error("no mount at {0}")]
    NotMounted(String),
}

/// A mounted backend.
pub struct MountEntry {
    path: String,
    backend: Arc<dyn Backend>,
}

impl MountEntry {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }
}

impl fmt::Debug for MountEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountEntry")
            .field("path", &self.path)
            .field("kind", &self.backend.kind())
            .finish()
    }
}

/// A cacheable path together with the function that fingerprints it.
#[derive(Clone)]
pub struct Cacheable {
    /// Mount point that owns the path.
    pub mount: String,
    /// The cacheable-path key that matched, relative to the mount.
    pub key: String,
    pub fingerprint: FingerprintFn,
}

impl fmt::Debug for Cacheable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cacheable")
            .field("mount", &self.mount)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// The mount table.
///
/// Structural changes take the write lock; lookups share the read lock and
/// hold it only for the prefix search itself.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use condcache::backend::SimpleBackend;
/// use condcache::context::Context;
/// use condcache::namespace::Namespace;
/// use condcache::router::Router;
///
/// let router = Router::new();
/// router
///     .mount("secret/", Arc::new(SimpleBackend::new("kv").cacheable("data/*").build()))
///     .unwrap();
///
/// let ctx = Context::with_namespace(Namespace::root());
/// assert!(router.cache_path(&ctx, "secret/data/app").is_some());
/// assert!(router.cache_path(&ctx, "secret/metadata/app").is_none());
/// ```
#[derive(Default)]
pub struct Router {
    mounts: RwLock<PrefixIndex<Arc<MountEntry>>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `backend` at `path`.
    ///
    /// `path` is canonicalized to carry no leading `/` and one trailing `/`.
    pub fn mount(&self, path: &str, backend: Arc<dyn Backend>) -> Result<(), RouterError> {
        let path = canonical_mount(path);
        let mut mounts = self.mounts.write();
        if mounts.get(&path).is_some() {
            return Err(RouterError::AlreadyMounted(path));
        }
        debug!(mount = %path, kind = backend.kind(), "mounting backend");
        mounts.insert(
            path.clone(),
            Arc::new(MountEntry { path, backend }),
        );
        Ok(())
    }

    /// Detaches whatever is mounted at `path`.
    pub fn unmount(&self, path: &str) -> Result<Arc<dyn Backend>, RouterError> {
        let path = canonical_mount(path);
        let removed = self.mounts.write().remove(&path);
        match removed {
            Some(entry) => {
                debug!(mount = %path, "unmounted backend");
                Ok(Arc::clone(&entry.backend))
            }
            None => Err(RouterError::NotMounted(path)),
        }
    }

    /// Returns the current mount points in order.
    pub fn mounts(&self) -> Vec<String> {
        self.mounts
            .read()
            .iter()
            .map(|(path, _)| path.to_owned())
            .collect()
    }

    /// Returns the mount owning `path` (already namespace-adjusted).
    pub fn match_mount(&self, path: &str) -> Option<Arc<MountEntry>> {
        self.mounts
            .read()
            .longest_prefix(path)
            .map(|(_, entry)| Arc::clone(entry))
    }

    /// Decides whether `path`, relative to the caller's namespace, is
    /// cacheable, and if so which function fingerprints requests to it.
    pub fn cache_path(&self, ctx: &Context, path: &str) -> Option<Cacheable> {
        let ns = match namespace::from_context(ctx) {
            Ok(ns) => ns,
            Err(e) => {
                debug!(path, error = %e, "namespace unresolved; not cacheable");
                return None;
            }
        };
        let adjusted = ns.adjust(path);

        let Some(entry) = self.match_mount(&adjusted) else {
            trace!(path = %adjusted, "no mount; not cacheable");
            return None;
        };
        let remainder = &adjusted[entry.path.len()..];

        let index = entry.backend.cacheable_paths().snapshot();
        let key = index.lookup(remainder)?;

        let fingerprint = entry
            .backend
            .fingerprint_fn(key)
            .unwrap_or_else(default_fingerprint_fn);

        trace!(mount = %entry.path, key, "path is cacheable");
        Some(Cacheable {
            mount: entry.path.clone(),
            key: key.to_owned(),
            fingerprint,
        })
    }
}

fn canonical_mount(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("{trimmed}/")
}
