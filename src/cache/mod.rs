//! Conditional-request caching.
//!
//! For every cacheable path the layer keeps one [`CacheEntry`]: the
//! fingerprint of the resource's current version and when it was recorded.
//! Requests carrying `If-Match`, `If-None-Match`, `If-Modified-Since` or
//! `If-Unmodified-Since` are checked against that entry before they reach a
//! backend, so a client can skip re-downloading an unchanged secret or avoid
//! overwriting a version it has not seen.
//!
//! - [`CacheStore`] persists entries per namespace.
//! - [`evaluate`] applies the RFC 7232 precedence rules.
//! - [`CacheLayer`] decides, per request, whether to dispatch.
//! - [`CacheMiddleware`] plugs the layer into a [`Pipeline`](crate::middleware::Pipeline).

mod conditional;
mod entry;
mod error;
mod layer;
mod middleware;
mod store;

pub use conditional::{MalformedDate, Precondition, evaluate};
pub use entry::CacheEntry;
pub use error::CacheError;
pub use layer::{CacheLayer, CacheOutcome, PendingEntry};
pub use middleware::CacheMiddleware;
pub use store::CacheStore;
