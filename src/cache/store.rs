//! Namespace-scoped persistence of [`CacheEntry`] records.
//!
//! Every entry lives under `<prefix><namespace-path><request-path>`, e.g.
//! `cache/team-a/secret/app`. The namespace is taken from the context on
//! every call, so two tenants can never address each other's entries.

use std::sync::Arc;

use tracing::trace;

use super::{CacheEntry, CacheError};
use crate::context::Context;
use crate::namespace;
use crate::storage::KvStore;

const DEFAULT_PREFIX: &str = "cache/";

/// Reads, writes and deletes cache entries on top of a [`KvStore`].
#[derive(Clone)]
pub struct CacheStore {
    kv: Arc<dyn KvStore>,
    prefix: String,
}

impl CacheStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            prefix: DEFAULT_PREFIX.to_owned(),
        }
    }

    /// Uses `prefix` as the first segment of every storage key.
    ///
    /// A missing trailing `/` is added. A prefix without a segment name
    /// would put entries in the backends' own keyspace, so it is refused.
    pub fn with_prefix(kv: Arc<dyn KvStore>, prefix: &str) -> Result<Self, CacheError> {
        let segment = prefix.trim_end_matches('/');
        if segment.trim_start_matches('/').is_empty() {
            return Err(CacheError::InvalidPrefix(prefix.to_owned()));
        }
        Ok(Self {
            kv,
            prefix: format!("{segment}/"),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the storage key for `path` in the caller's namespace.
    pub fn storage_key(&self, ctx: &Context, path: &str) -> Result<String, CacheError> {
        let ns = namespace::from_context(ctx)?;
        Ok(format!("{}{}", self.prefix, ns.adjust(path)))
    }

    /// Loads the entry for `path`, or `None` if there is none.
    pub async fn read(&self, ctx: &Context, path: &str) -> Result<Option<CacheEntry>, CacheError> {
        let key = self.storage_key(ctx, path)?;
        ctx.check_deadline()?;
        let Some(raw) = self.kv.get(&key).await? else {
            trace!(key = %key, "no cache entry");
            return Ok(None);
        };
        Ok(Some(CacheEntry::decode(&key, &raw)?))
    }

    /// Stores `entry` for `path`, replacing whatever was there.
    pub async fn write(&self, ctx: &Context, path: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        let key = self.storage_key(ctx, path)?;
        ctx.check_deadline()?;
        self.put(&key, entry).await
    }

    /// Removes the entry for `path`. Removing a missing entry succeeds.
    pub async fn delete(&self, ctx: &Context, path: &str) -> Result<(), CacheError> {
        let key = self.storage_key(ctx, path)?;
        ctx.check_deadline()?;
        self.kv.delete(&key).await?;
        trace!(key = %key, "cache entry deleted");
        Ok(())
    }

    pub(crate) async fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        if entry.key.is_empty() {
            return Err(CacheError::EmptyFingerprint(key.to_owned()));
        }
        let raw = entry.encode()?;
        self.kv.put(key, raw).await?;
        trace!(key, fingerprint = %entry.key, "cache entry written");
        Ok(())
    }
}
