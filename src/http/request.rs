//! The logical request handed to the cache layer by the dispatch pipeline.

use uuid::Uuid;

use super::{Headers, Operation};

/// A logical request against a backend path.
///
/// Paths are stored without a leading `/`, the way mount points are
/// registered. Every request carries a unique id, which doubles as the
/// default fingerprint for cacheable paths.
///
/// # Examples
///
/// ```
/// use condcache::http::{Operation, Request};
///
/// let request = Request::new(Operation::Read, "/secret/app")
///     .header("If-None-Match", "\"abc123\"");
///
/// assert_eq!(request.path(), "secret/app");
/// assert_eq!(request.headers().get("if-none-match"), Some("\"abc123\""));
/// assert!(!request.id().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    id: String,
    operation: Operation,
    path: String,
    headers: Headers,
}

impl Request {
    /// Creates a request with a freshly generated id.
    pub fn new(operation: Operation, path: impl AsRef<str>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            operation,
            path: path.as_ref().trim_start_matches('/').to_owned(),
            headers: Headers::new(),
        }
    }

    /// Replaces the generated id, e.g. with one assigned upstream.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Appends a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the request path, relative to the namespace root.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}
