//! # condcache
//!
//! HTTP conditional-request caching for a multi-tenant secrets pipeline.
//!
//! Backends mounted on a [`Router`](router::Router) declare which of their
//! paths are cacheable. For those paths the [`CacheLayer`](cache::CacheLayer)
//! remembers a fingerprint per namespace and answers `If-None-Match` and
//! friends with `304 Not Modified` or `412 Precondition Failed` before the
//! request is dispatched.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use condcache::backend::SimpleBackend;
//! use condcache::cache::{CacheLayer, CacheMiddleware};
//! use condcache::context::Context;
//! use condcache::http::{Operation, Request, Response, StatusCode};
//! use condcache::middleware::{Pipeline, endpoint, from_middleware};
//! use condcache::namespace::Namespace;
//! use condcache::router::Router;
//! use condcache::storage::InMemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::new();
//!     router.mount("secret/", Arc::new(SimpleBackend::new("kv").cacheable("*").build()))?;
//!     let layer = Arc::new(CacheLayer::new(Arc::new(router), Arc::new(InMemoryStore::new())));
//!
//!     let pipeline = Pipeline::new()
//!         .with(from_middleware(Arc::new(CacheMiddleware::new(layer))))
//!         .with(endpoint(|_ctx, _req| async { Response::empty(StatusCode::Ok) }));
//!
//!     let ctx = Context::with_namespace(Namespace::root());
//!     let response = pipeline
//!         .dispatch(ctx, Request::new(Operation::Read, "secret/app"))
//!         .await;
//!     println!("{}", response.status());
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod context;
pub mod http;
pub mod middleware;
pub mod namespace;
pub mod router;
pub mod storage;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{CacheError, CacheLayer, CacheMiddleware};
pub use http::{Headers, Operation, Request, Response, StatusCode};
