use thiserror::Error;

use super::conditional::MalformedDate;
use crate::context::DeadlineExceeded;
use crate::namespace::NamespaceError;
use crate::storage::StorageError;

/// Errors surfaced by the cache layer.
///
/// A missing cache entry is not an error; reads return `Ok(None)`.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    #[error(transparent)]
    MalformedDate(#[from] MalformedDate),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cancelled(#[from] DeadlineExceeded),

    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("refusing to store an empty fingerprint for {0}")]
    EmptyFingerprint(String),

    #[error("invalid cache path: {0:?}")]
    InvalidPath(String),

    #[error("cache key prefix must name a segment, got {0:?}")]
    InvalidPrefix(String),
}
