//! Middleware pipeline — composable before/after logic around request dispatch.
//!
//! Each middleware wraps the next layer, so it can inspect the request,
//! answer it directly, or decorate the downstream response. The last entry
//! of a [`Pipeline`] is the endpoint: the backend handler that actually
//! serves the request.
//!
//! ## Core types
//!
//! - [`Middleware`] — trait implemented by all middleware.
//! - [`Next`] — cursor into the remaining chain; call [`Next::run`] to
//!   advance to the next layer.
//! - [`MiddlewareHandler`] — type-erased, cheaply-cloneable middleware function.
//! - [`from_middleware`] / [`endpoint`] — build handlers from a [`Middleware`]
//!   or from a plain async function.
//! - [`Pipeline`] — an ordered stack that dispatches requests through the chain.
//! - [`LoggerMiddleware`] — built-in request/response logger.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::time::Instant;

use crate::{
    context::Context,
    http::{Request, Response, StatusCode},
};

/// A boxed, sendable response future.
pub type ResponseFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is passed to each middleware's [`Middleware::handle`] implementation.
/// Calling [`Next::run`] advances the cursor by one position and invokes the
/// next middleware, or returns a fallback `500` response when the chain is
/// exhausted without any layer producing a response.
///
/// `Next` is consumed on each call to [`run`](Self::run), so it cannot be
/// called more than once per middleware invocation.
///
/// # Examples
///
/// ```rust,no_run
/// use condcache::context::Context;
/// use condcache::http::Request;
/// use condcache::middleware::{Middleware, Next, ResponseFuture};
///
/// struct PassThrough;
///
/// impl Middleware for PassThrough {
///     fn handle(&self, ctx: Context, req: Request, next: Next) -> ResponseFuture {
///         Box::pin(async move { next.run(ctx, req).await })
///     }
/// }
/// ```
pub struct Next {
    middlewares: Arc<[MiddlewareHandler]>,
    // Tracks which middleware to invoke on the next `run` call.
    index: usize,
}

/// A type-erased, reference-counted middleware function.
///
/// Every entry in a [`Pipeline`] is stored as a `MiddlewareHandler`. The
/// [`Arc`] wrapper makes handlers cheap to clone so that [`Next`] can advance
/// through the chain without copying closures.
pub type MiddlewareHandler =
    Arc<dyn Fn(Context, Request, Next) -> ResponseFuture + Send + Sync + 'static>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use condcache::middleware::{LoggerMiddleware, from_middleware};
///
/// let handler = from_middleware(Arc::new(LoggerMiddleware));
/// ```
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, req: Request, next: Next| middleware.handle(ctx, req, next))
}

/// Wraps a backend handler as the terminal entry of a chain.
///
/// The handler never sees `Next`; whatever it returns is the response.
pub fn endpoint<F, Fut>(handler: F) -> MiddlewareHandler
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |ctx: Context, req: Request, _next: Next| -> ResponseFuture {
        Box::pin(handler(ctx, req))
    })
}

impl Next {
    /// Creates a new `Next` positioned at the start of the given chain.
    pub fn new(middlewares: impl Into<Arc<[MiddlewareHandler]>>) -> Self {
        Self {
            middlewares: middlewares.into(),
            index: 0,
        }
    }

    /// Invokes the next middleware in the chain and returns its response.
    ///
    /// If no handler remains, a `500 Internal Server Error` response is
    /// returned as a safe fallback.
    pub async fn run(mut self, ctx: Context, req: Request) -> Response {
        if let Some(handler) = self.middlewares.get(self.index).cloned() {
            self.index += 1;
            handler(ctx, req, self).await
        } else {
            Response::empty(StatusCode::InternalServerError)
                .body("No response generated by middleware pipeline")
        }
    }
}

/// The core trait for all middleware.
///
/// Implementors receive the per-request [`Context`], the [`Request`] and a
/// [`Next`] cursor. They may:
///
/// - **Pass through** — call `next.run(ctx, req).await` without modification.
/// - **Short-circuit** — return a [`Response`] directly without calling `next`.
/// - **Decorate** — call `next.run(ctx, req).await`, inspect the response, and
///   return a modified copy.
///
/// # Contract
///
/// - Implementations **must** be `Send + Sync` because middleware is shared
///   across Tokio tasks.
/// - `handle` **must** return a pinned, `Send` future.
/// - Implementations **should not** hold locks across an `.await` point.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, req: Request, next: Next) -> ResponseFuture;
}

/// An ordered middleware stack ending in an endpoint.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use condcache::context::Context;
/// use condcache::http::{Operation, Request, Response, StatusCode};
/// use condcache::middleware::{LoggerMiddleware, Pipeline, endpoint, from_middleware};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let pipeline = Pipeline::new()
///     .with(from_middleware(Arc::new(LoggerMiddleware)))
///     .with(endpoint(|_ctx, _req| async { Response::empty(StatusCode::NoContent) }));
///
/// let response = pipeline
///     .dispatch(Context::new(), Request::new(Operation::Read, "secret/app"))
///     .await;
/// assert_eq!(response.status(), StatusCode::NoContent);
/// # }
/// ```
#[derive(Default, Clone)]
pub struct Pipeline {
    middlewares: Vec<MiddlewareHandler>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler to the end of the chain.
    #[must_use]
    pub fn with(mut self, handler: MiddlewareHandler) -> Self {
        self.middlewares.push(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Runs `req` through the chain from the first handler.
    pub async fn dispatch(&self, ctx: Context, req: Request) -> Response {
        Next::new(self.middlewares.clone()).run(ctx, req).await
    }
}

/// Built-in middleware that logs each request's operation, path, status and
/// duration.
///
/// Emits a single `tracing::info!` line after the downstream handler
/// completes, in the format:
///
/// ```text
/// OPERATION path - STATUS (duration)
/// ```
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, req: Request, next: Next) -> ResponseFuture {
        Box::pin(async move {
            let start = Instant::now();
            let operation = req.operation();
            let path = req.path().to_owned();

            let response = next.run(ctx, req).await;

            let duration = start.elapsed();
            let status = response.status().as_u16();

            tracing::info!("{} {} - {} ({:?})", operation, path, status, duration);

            response
        })
    }
}
