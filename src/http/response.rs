//! Responses produced by the cache layer and the handlers behind it.

use bytes::Bytes;

use super::{Headers, StatusCode, headers::ETAG};

/// A response flowing back through the pipeline.
///
/// The cache layer itself only ever synthesizes bodiless responses
/// ([`Response::empty`]); handlers behind it may attach a body.
///
/// # Examples
///
/// ```
/// use condcache::http::{Response, StatusCode};
///
/// let response = Response::empty(StatusCode::NotModified).etag("abc123");
///
/// assert_eq!(response.status(), StatusCode::NotModified);
/// assert_eq!(response.headers().get("etag"), Some("\"abc123\""));
/// assert!(response.body_bytes().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Creates a response with the given status, no headers and no body.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Appends a response header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends a header in place, for middleware decorating a downstream response.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Sets the `Etag` header to `fingerprint` as a strong entity tag,
    /// replacing any previous value.
    #[must_use]
    pub fn etag(mut self, fingerprint: &str) -> Self {
        self.set_etag(fingerprint);
        self
    }

    pub fn set_etag(&mut self, fingerprint: &str) {
        self.headers.remove(ETAG);
        self.headers.insert(ETAG, format!("\"{fingerprint}\""));
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }
}
