//! Pipeline adapter for [`CacheLayer`].

use std::sync::Arc;

use tracing::{error, warn};

use super::{CacheLayer, CacheOutcome};
use crate::context::Context;
use crate::http::{Request, Response, StatusCode};
use crate::middleware::{Middleware, Next, ResponseFuture};

/// Puts a [`CacheLayer`] in front of the rest of a pipeline.
///
/// Short-circuit outcomes are returned without dispatching. A cache error
/// that forbids dispatch becomes a `500`. Responses of dispatched requests
/// carry the current fingerprint as `Etag` when `emit_etag` is set, and an
/// update's new fingerprint is stored only if its handler succeeded.
pub struct CacheMiddleware {
    layer: Arc<CacheLayer>,
}

impl CacheMiddleware {
    pub fn new(layer: Arc<CacheLayer>) -> Self {
        Self { layer }
    }
}

impl Middleware for CacheMiddleware {
    fn handle(&self, ctx: Context, req: Request, next: Next) -> ResponseFuture {
        let layer = self.layer.clone();
        Box::pin(async move {
            let outcome = match layer.handle(&ctx, &req).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(path = %req.path(), error = %e, "cache layer failed");
                    return Response::empty(StatusCode::InternalServerError);
                }
            };

            let emit_etag = layer.config().emit_etag;
            match outcome {
                CacheOutcome::ShortCircuit(response) => response,
                CacheOutcome::Continue { etag } => {
                    let mut response = next.run(ctx, req).await;
                    if let Some(etag) = etag.filter(|_| emit_etag) {
                        if response.status().is_success() {
                            response.set_etag(&etag);
                        }
                    }
                    response
                }
                CacheOutcome::Degraded(_) => next.run(ctx, req).await,
                CacheOutcome::Refresh(pending) => {
                    let path = req.path().to_owned();
                    let mut response = next.run(ctx, req).await;
                    if !response.status().is_success() {
                        return response;
                    }
                    match layer.commit(pending).await {
                        Ok(etag) if emit_etag => response.set_etag(&etag),
                        Ok(_) => {}
                        Err(e) => warn!(path = %path, error = %e, "failed to refresh cache entry"),
                    }
                    response
                }
            }
        })
    }
}
