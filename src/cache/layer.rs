//! Request-time entry point tying resolution, storage and evaluation
//! together.

use std::fmt;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::conditional::{self, Precondition};
use super::{CacheEntry, CacheError, CacheStore};
use crate::backend::default_fingerprint;
use crate::config::CacheConfig;
use crate::context::{Context, DeadlineExceeded};
use crate::http::{Operation, Request, Response, StatusCode};
use crate::router::{Cacheable, Router};
use crate::storage::KvStore;

/// What the pipeline should do with a request after the cache layer saw it.
#[derive(Debug)]
pub enum CacheOutcome {
    /// Dispatch the request. `etag` is the current fingerprint of the path
    /// when one is known.
    Continue { etag: Option<String> },
    /// Dispatch the request, then [`commit`](CacheLayer::commit) the pending
    /// entry if the handler succeeded.
    Refresh(PendingEntry),
    /// Dispatch the request; a best-effort cache write failed.
    Degraded(CacheError),
    /// Answer with this response instead of dispatching.
    ShortCircuit(Response),
}

impl CacheOutcome {
    fn proceed() -> Self {
        Self::Continue { etag: None }
    }

    pub fn should_continue(&self) -> bool {
        !matches!(self, Self::ShortCircuit(_))
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::ShortCircuit(response) => Some(response),
            _ => None,
        }
    }
}

/// An entry computed before dispatch and written only once the handler
/// has succeeded.
pub struct PendingEntry {
    storage_key: String,
    entry: CacheEntry,
    deadline: Option<Instant>,
}

impl PendingEntry {
    pub fn fingerprint(&self) -> &str {
        &self.entry.key
    }
}

impl fmt::Debug for PendingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingEntry")
            .field("storage_key", &self.storage_key)
            .field("fingerprint", &self.entry.key)
            .finish_non_exhaustive()
    }
}

/// The conditional-request cache layer.
///
/// Per operation on a cacheable path:
///
/// | Operation           | Entry     | Action                                                   |
/// |---------------------|-----------|----------------------------------------------------------|
/// | delete              | any       | delete entry, continue                                   |
/// | create              | any       | write fresh entry, continue                              |
/// | read / list / update| absent    | write fresh entry, continue                              |
/// | read / list / update| present   | evaluate preconditions: continue, `304`, or `412`        |
///
/// An update that passes its preconditions yields [`CacheOutcome::Refresh`]
/// so the new fingerprint is only stored after the handler succeeds.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use condcache::backend::SimpleBackend;
/// use condcache::cache::{CacheLayer, CacheOutcome};
/// use condcache::context::Context;
/// use condcache::http::{Operation, Request, StatusCode};
/// use condcache::namespace::Namespace;
/// use condcache::router::Router;
/// use condcache::storage::InMemoryStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let router = Router::new();
/// router.mount("secret/", Arc::new(SimpleBackend::new("kv").cacheable("*").build()))?;
/// let layer = CacheLayer::new(Arc::new(router), Arc::new(InMemoryStore::new()));
/// let ctx = Context::with_namespace(Namespace::root());
///
/// let create = Request::new(Operation::Create, "secret/app").with_id("v1");
/// layer.handle(&ctx, &create).await?;
///
/// let read = Request::new(Operation::Read, "secret/app").header("If-None-Match", "\"v1\"");
/// match layer.handle(&ctx, &read).await? {
///     CacheOutcome::ShortCircuit(resp) => assert_eq!(resp.status(), StatusCode::NotModified),
///     other => panic!("expected 304, got {other:?}"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct CacheLayer {
    router: Arc<Router>,
    store: CacheStore,
    config: CacheConfig,
}

impl CacheLayer {
    pub fn new(router: Arc<Router>, kv: Arc<dyn KvStore>) -> Self {
        Self {
            router,
            store: CacheStore::new(kv),
            config: CacheConfig::default(),
        }
    }

    /// # Errors
    ///
    /// Fails with [`CacheError::InvalidPrefix`] when `config.key_prefix` is
    /// empty.
    pub fn with_config(
        router: Arc<Router>,
        kv: Arc<dyn KvStore>,
        config: CacheConfig,
    ) -> Result<Self, CacheError> {
        Ok(Self {
            router,
            store: CacheStore::with_prefix(kv, &config.key_prefix)?,
            config,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Runs the cache layer for one request.
    ///
    /// # Errors
    ///
    /// Fails when the stored entry cannot be loaded or a date precondition
    /// is malformed; the request must then not be dispatched. Failures of
    /// best-effort writes are reported as [`CacheOutcome::Degraded`].
    #[instrument(skip_all, fields(op = %req.operation(), path = %req.path()))]
    pub async fn handle(&self, ctx: &Context, req: &Request) -> Result<CacheOutcome, CacheError> {
        if !self.config.enabled {
            return Ok(CacheOutcome::proceed());
        }
        let Some(cacheable) = self.router.cache_path(ctx, req.path()) else {
            return Ok(CacheOutcome::proceed());
        };

        let operation = req.operation();
        match operation {
            Operation::Delete => Ok(match self.store.delete(ctx, req.path()).await {
                Ok(()) => CacheOutcome::proceed(),
                Err(e) => {
                    warn!(error = %e, "failed to delete cache entry");
                    CacheOutcome::Degraded(e)
                }
            }),
            Operation::Create => Ok(self.record(ctx, req, &cacheable).await),
            Operation::Read | Operation::List | Operation::Update => {
                let Some(entry) = self.store.read(ctx, req.path()).await? else {
                    debug!("no cache entry; populating");
                    return Ok(self.record(ctx, req, &cacheable).await);
                };

                let precondition = conditional::evaluate(
                    req.headers(),
                    operation,
                    &entry,
                    self.config.check_time_headers,
                )?;
                debug!(?precondition, fingerprint = %entry.key, "preconditions evaluated");

                Ok(match precondition {
                    Precondition::PassThrough if operation == Operation::Update => {
                        CacheOutcome::Refresh(PendingEntry {
                            storage_key: self.store.storage_key(ctx, req.path())?,
                            entry: CacheEntry::new(fingerprint(&cacheable, req)),
                            deadline: ctx.deadline(),
                        })
                    }
                    Precondition::PassThrough => CacheOutcome::Continue {
                        etag: Some(entry.key),
                    },
                    Precondition::NotModified => {
                        let mut response = Response::empty(StatusCode::NotModified);
                        if self.config.emit_etag {
                            response.set_etag(&entry.key);
                        }
                        CacheOutcome::ShortCircuit(response)
                    }
                    Precondition::Failed => {
                        CacheOutcome::ShortCircuit(Response::empty(StatusCode::PreconditionFailed))
                    }
                })
            }
        }
    }

    /// Stores an entry computed by [`handle`](Self::handle) and returns its
    /// fingerprint.
    pub async fn commit(&self, pending: PendingEntry) -> Result<String, CacheError> {
        if pending.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(DeadlineExceeded.into());
        }
        self.store.put(&pending.storage_key, &pending.entry).await?;
        Ok(pending.entry.key)
    }

    /// Returns the stored fingerprint for `path` in the caller's namespace.
    pub async fn read_etag(&self, ctx: &Context, path: &str) -> Result<Option<String>, CacheError> {
        let trimmed = path.trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(CacheError::InvalidPath(path.to_owned()));
        }
        Ok(self.store.read(ctx, trimmed).await?.map(|entry| entry.key))
    }

    /// Describes the cache entry for `path`: `200` with its `Etag`, or `404`.
    pub async fn inspect(&self, ctx: &Context, path: &str) -> Result<Response, CacheError> {
        Ok(match self.read_etag(ctx, path).await? {
            Some(etag) => Response::empty(StatusCode::Ok).etag(&etag),
            None => Response::empty(StatusCode::NotFound),
        })
    }

    async fn record(&self, ctx: &Context, req: &Request, cacheable: &Cacheable) -> CacheOutcome {
        let entry = CacheEntry::new(fingerprint(cacheable, req));
        match self.store.write(ctx, req.path(), &entry).await {
            Ok(()) => CacheOutcome::Continue {
                etag: Some(entry.key),
            },
            Err(e) => {
                warn!(error = %e, "failed to record cache entry");
                CacheOutcome::Degraded(e)
            }
        }
    }
}

fn fingerprint(cacheable: &Cacheable, req: &Request) -> String {
    let key = (cacheable.fingerprint)(req);
    if key.is_empty() {
        default_fingerprint(req)
    } else {
        key
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::backend::SimpleBackend;
    use crate::http::headers::{ETAG, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH};
    use crate::namespace::Namespace;
    use crate::storage::InMemoryStore;

    struct Fixture {
        kv: Arc<InMemoryStore>,
        layer: CacheLayer,
        ctx: Context,
    }

    fn fixture() -> Fixture {
        fixture_with(CacheConfig::default())
    }

    fn fixture_with(config: CacheConfig) -> Fixture {
        let router = Router::new();
        router
            .mount(
                "secret/",
                Arc::new(
                    SimpleBackend::new("kv")
                        .cacheable("data/*")
                        .cacheable_with("config", |_| "cfg-v1".to_owned())
                        .cacheable_with("blank", |_| String::new())
                        .build(),
                ),
            )
            .unwrap();
        let kv = Arc::new(InMemoryStore::new());
        let layer = CacheLayer::with_config(Arc::new(router), kv.clone(), config).unwrap();
        Fixture {
            kv,
            layer,
            ctx: Context::with_namespace(Namespace::root()),
        }
    }

    impl Fixture {
        async fn seed(&self, path: &str, key: &str) {
            self.layer
                .store()
                .write(&self.ctx, path, &CacheEntry::new(key))
                .await
                .unwrap();
        }

        async fn stored(&self, path: &str) -> Option<String> {
            self.layer.read_etag(&self.ctx, path).await.unwrap()
        }

        async fn run(&self, req: Request) -> CacheOutcome {
            self.layer.handle(&self.ctx, &req).await.unwrap()
        }
    }

    fn status(outcome: &CacheOutcome) -> Option<StatusCode> {
        outcome.response().map(Response::status)
    }

    #[tokio::test]
    async fn non_cacheable_path_always_continues() {
        let f = fixture();
        for op in [
            Operation::Create,
            Operation::Read,
            Operation::Update,
            Operation::Delete,
            Operation::List,
        ] {
            let req = Request::new(op, "secret/other").header(IF_MATCH, "\"nope\"");
            let outcome = f.run(req).await;
            assert!(matches!(outcome, CacheOutcome::Continue { etag: None }));
        }
        assert!(f.kv.is_empty());
    }

    #[tokio::test]
    async fn disabled_layer_continues() {
        let f = fixture_with(CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        });
        f.seed("secret/data/a", "abc123").await;
        let req = Request::new(Operation::Read, "secret/data/a").header(IF_NONE_MATCH, "\"abc123\"");
        assert!(f.run(req).await.should_continue());
    }

    #[tokio::test]
    async fn if_none_match_hit_on_read_answers_304() {
        let f = fixture();
        f.seed("secret/data/a", "abc123").await;
        let req = Request::new(Operation::Read, "secret/data/a").header(IF_NONE_MATCH, "\"abc123\"");
        let outcome = f.run(req).await;

        assert!(!outcome.should_continue());
        let response = outcome.response().unwrap();
        assert_eq!(response.status(), StatusCode::NotModified);
        assert_eq!(response.headers().get(ETAG), Some("\"abc123\""));
        assert!(response.body_bytes().is_empty());
    }

    #[tokio::test]
    async fn if_match_miss_on_update_answers_412() {
        let f = fixture();
        f.seed("secret/data/a", "abc123").await;
        let req = Request::new(Operation::Update, "secret/data/a").header(IF_MATCH, "\"zzz\"");
        let outcome = f.run(req).await;

        assert!(!outcome.should_continue());
        assert_eq!(status(&outcome), Some(StatusCode::PreconditionFailed));
        assert_eq!(f.stored("secret/data/a").await.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn create_persists_fingerprint_and_continues() {
        let f = fixture();
        let req = Request::new(Operation::Create, "secret/data/new").with_id("req-1");
        let outcome = f.run(req).await;

        assert!(matches!(outcome, CacheOutcome::Continue { etag: Some(ref e) } if e == "req-1"));
        assert_eq!(f.stored("secret/data/new").await.as_deref(), Some("req-1"));
    }

    #[tokio::test]
    async fn create_ignores_preconditions() {
        let f = fixture();
        f.seed("secret/data/a", "abc123").await;
        let req = Request::new(Operation::Create, "secret/data/a")
            .with_id("req-2")
            .header(IF_MATCH, "\"zzz\"");
        assert!(f.run(req).await.should_continue());
        assert_eq!(f.stored("secret/data/a").await.as_deref(), Some("req-2"));
    }

    #[tokio::test]
    async fn delete_removes_entry_and_continues() {
        let f = fixture();
        f.seed("secret/data/a", "abc123").await;
        let outcome = f.run(Request::new(Operation::Delete, "secret/data/a")).await;

        assert!(matches!(outcome, CacheOutcome::Continue { etag: None }));
        assert!(f.stored("secret/data/a").await.is_none());
        assert!(f.kv.is_empty());
    }

    #[tokio::test]
    async fn malformed_if_modified_since_is_an_error() {
        let f = fixture();
        f.seed("secret/data/a", "abc123").await;
        let req = Request::new(Operation::Read, "secret/data/a").header(IF_MODIFIED_SINCE, "not-a-date");
        let err = f.layer.handle(&f.ctx, &req).await.unwrap_err();
        assert!(matches!(err, CacheError::MalformedDate(ref e) if e.header == IF_MODIFIED_SINCE));
    }

    #[tokio::test]
    async fn first_read_populates_entry() {
        let f = fixture();
        let req = Request::new(Operation::Read, "secret/data/a")
            .with_id("req-3")
            .header(IF_NONE_MATCH, "\"req-3\"");
        let outcome = f.run(req).await;

        // nothing to validate against yet, so the request proceeds
        assert!(matches!(outcome, CacheOutcome::Continue { etag: Some(ref e) } if e == "req-3"));
        assert_eq!(f.stored("secret/data/a").await.as_deref(), Some("req-3"));
    }

    #[tokio::test]
    async fn repeated_reads_are_idempotent() {
        let f = fixture();
        f.seed("secret/data/a", "abc123").await;

        let mut outcomes = Vec::new();
        for _ in 0..2 {
            let req = Request::new(Operation::Read, "secret/data/a").header(IF_NONE_MATCH, "\"other\"");
            outcomes.push(f.run(req).await);
        }
        for outcome in outcomes {
            assert!(matches!(outcome, CacheOutcome::Continue { etag: Some(ref e) } if e == "abc123"));
        }
        assert_eq!(f.stored("secret/data/a").await.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn update_refresh_is_deferred_until_commit() {
        let f = fixture();
        f.seed("secret/data/a", "abc123").await;
        let req = Request::new(Operation::Update, "secret/data/a")
            .with_id("req-4")
            .header(IF_MATCH, "\"abc123\"");

        let CacheOutcome::Refresh(pending) = f.run(req).await else {
            panic!("expected a pending refresh");
        };
        assert_eq!(pending.fingerprint(), "req-4");
        assert_eq!(f.stored("secret/data/a").await.as_deref(), Some("abc123"));

        assert_eq!(f.layer.commit(pending).await.unwrap(), "req-4");
        assert_eq!(f.stored("secret/data/a").await.as_deref(), Some("req-4"));
    }

    #[tokio::test]
    async fn commit_respects_deadline() {
        let f = fixture();
        f.seed("secret/data/a", "abc123").await;
        let ctx = Context::with_namespace(Namespace::root()).with_timeout(Duration::from_millis(20));
        let req = Request::new(Operation::Update, "secret/data/a");

        let CacheOutcome::Refresh(pending) = f.layer.handle(&ctx, &req).await.unwrap() else {
            panic!("expected a pending refresh");
        };
        tokio::time::sleep(Duration::from_millis(40)).await;
        let err = f.layer.commit(pending).await.unwrap_err();
        assert!(matches!(err, CacheError::Cancelled(_)));
        assert_eq!(f.stored("secret/data/a").await.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn custom_fingerprint_is_used() {
        let f = fixture();
        f.run(Request::new(Operation::Create, "secret/config")).await;
        assert_eq!(f.stored("secret/config").await.as_deref(), Some("cfg-v1"));
    }

    #[tokio::test]
    async fn empty_custom_fingerprint_falls_back_to_request_id() {
        let f = fixture();
        f.run(Request::new(Operation::Create, "secret/blank").with_id("req-5"))
            .await;
        assert_eq!(f.stored("secret/blank").await.as_deref(), Some("req-5"));
    }

    #[tokio::test]
    async fn time_headers_follow_config() {
        let f = fixture_with(CacheConfig {
            check_time_headers: false,
            ..CacheConfig::default()
        });
        f.seed("secret/data/a", "abc123").await;
        let req = Request::new(Operation::Read, "secret/data/a").header(IF_MODIFIED_SINCE, "not-a-date");
        assert!(f.run(req).await.should_continue());
    }

    #[tokio::test]
    async fn if_modified_since_in_future_answers_304() {
        let f = fixture();
        f.seed("secret/data/a", "abc123").await;
        let later = httpdate::fmt_http_date(SystemTime::now() + Duration::from_secs(3600));
        let req = Request::new(Operation::Read, "secret/data/a").header(IF_MODIFIED_SINCE, later);
        assert_eq!(status(&f.run(req).await), Some(StatusCode::NotModified));
    }

    #[tokio::test]
    async fn tenants_do_not_share_entries() {
        let router = Router::new();
        for mount in ["secret/", "team-a/secret/"] {
            router
                .mount(mount, Arc::new(SimpleBackend::new("kv").cacheable("*").build()))
                .unwrap();
        }
        let layer = CacheLayer::new(Arc::new(router), Arc::new(InMemoryStore::new()));
        let root = Context::with_namespace(Namespace::root());
        let team = Context::with_namespace(Namespace::new("a", "team-a"));

        let create = Request::new(Operation::Create, "secret/app").with_id("root-v1");
        layer.handle(&root, &create).await.unwrap();

        let read = Request::new(Operation::Read, "secret/app").header(IF_NONE_MATCH, "\"root-v1\"");
        assert!(!layer.handle(&root, &read).await.unwrap().should_continue());
        // the other tenant has no entry, so it populates instead of answering 304
        assert!(layer.handle(&team, &read).await.unwrap().should_continue());
    }

    #[tokio::test]
    async fn missing_namespace_is_not_cacheable() {
        let f = fixture();
        let req = Request::new(Operation::Create, "secret/data/a");
        let outcome = f.layer.handle(&Context::new(), &req).await.unwrap();
        assert!(matches!(outcome, CacheOutcome::Continue { etag: None }));
        assert!(f.kv.is_empty());
    }

    #[tokio::test]
    async fn expired_deadline_degrades_writes_and_fails_reads() {
        let f = fixture();
        f.seed("secret/data/a", "abc123").await;
        let ctx = Context::with_namespace(Namespace::root()).with_timeout(Duration::ZERO);

        let create = Request::new(Operation::Create, "secret/data/b");
        let outcome = f.layer.handle(&ctx, &create).await.unwrap();
        assert!(matches!(outcome, CacheOutcome::Degraded(CacheError::Cancelled(_))));

        let read = Request::new(Operation::Read, "secret/data/a");
        let err = f.layer.handle(&ctx, &read).await.unwrap_err();
        assert!(matches!(err, CacheError::Cancelled(_)));
    }

    #[tokio::test]
    async fn empty_key_prefix_is_rejected_before_any_write() {
        let kv = Arc::new(InMemoryStore::new());
        kv.put("secret/app", bytes::Bytes::from_static(b"the-real-secret"))
            .await
            .unwrap();
        let config = CacheConfig::from_json(r#"{"key_prefix": ""}"#).unwrap();

        let err = CacheLayer::with_config(Arc::new(Router::new()), kv.clone(), config)
            .err()
            .unwrap();
        assert!(matches!(err, CacheError::InvalidPrefix(_)));
        assert_eq!(kv.keys(), vec!["secret/app"]);
    }

    #[tokio::test]
    async fn literal_key_prefix_is_separated_from_the_path() {
        let f = fixture_with(CacheConfig {
            key_prefix: "etags".to_owned(),
            ..CacheConfig::default()
        });
        f.run(Request::new(Operation::Create, "secret/data/a").with_id("r1"))
            .await;
        assert_eq!(f.kv.keys(), vec!["etags/secret/data/a"]);
    }

    #[tokio::test]
    async fn inspect_reports_stored_etag() {
        let f = fixture();
        f.seed("secret/data/a", "abc123").await;

        let found = f.layer.inspect(&f.ctx, "/secret/data/a").await.unwrap();
        assert_eq!(found.status(), StatusCode::Ok);
        assert_eq!(found.headers().get(ETAG), Some("\"abc123\""));

        let missing = f.layer.inspect(&f.ctx, "secret/data/zzz").await.unwrap();
        assert_eq!(missing.status(), StatusCode::NotFound);

        let err = f.layer.read_etag(&f.ctx, "/").await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidPath(ref p) if p == "/"));
    }
}
