//! Durable key-value storage seam.
//!
//! The cache layer never talks to a storage engine directly; it goes
//! through [`KvStore`], which promises atomic per-key `get`/`put`/`delete`
//! and nothing more. There are no cross-key transactions.
//! [`InMemoryStore`] is the reference implementation used by tests and
//! single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use thiserror::Error;

/// Errors surfaced by a storage engine.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt value at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Atomic per-key storage.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the value at `key`, or `None` if nothing is stored there.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError>;

    /// Store `value` at `key`, replacing any previous value.
    async fn put(&self, key: &str, value: Bytes) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// A process-local [`KvStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns every stored key in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KvStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
