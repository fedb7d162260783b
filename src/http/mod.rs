//! Request-side protocol types shared by the cache layer.
//!
//! This module provides the primitives the rest of the crate speaks in:
//! [`Operation`], [`StatusCode`], [`Headers`], [`Request`], and [`Response`].

use std::fmt;

pub mod headers;
pub mod request;
pub mod response;

pub use headers::Headers;
pub use request::Request;
pub use response::Response;

/// The subset of HTTP status codes the cache layer produces or reports.
///
/// # Examples
///
/// ```
/// use condcache::http::StatusCode;
///
/// let status = StatusCode::NotModified;
/// assert_eq!(status.as_u16(), 304);
/// assert_eq!(status.canonical_reason(), "Not Modified");
/// assert!(!status.is_success());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StatusCode {
    Ok = 200,
    NoContent = 204,
    NotModified = 304,
    BadRequest = 400,
    NotFound = 404,
    PreconditionFailed = 412,
    InternalServerError = 500,
}

impl StatusCode {
    /// Returns the numeric status code as a `u16`.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the canonical reason phrase for this status code.
    pub fn canonical_reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NoContent => "No Content",
            Self::NotModified => "Not Modified",
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::PreconditionFailed => "Precondition Failed",
            Self::InternalServerError => "Internal Server Error",
        }
    }

    /// Returns `true` for 2xx codes.
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.as_u16())
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.canonical_reason())
    }
}

/// The logical operation a request performs against a backend path.
///
/// Backends see operations rather than raw HTTP methods; the front end maps
/// one to the other with [`Operation::from_http_method`].
///
/// # Examples
///
/// ```
/// use condcache::http::Operation;
///
/// let op: Operation = "list".parse().unwrap();
/// assert_eq!(op, Operation::List);
/// assert!(op.is_read());
/// assert!(!Operation::Update.is_read());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

/// Returned when an operation name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation: {0}")]
pub struct UnknownOperation(pub String);

impl Operation {
    /// Returns the lowercase operation name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
        }
    }

    /// Returns `true` for read-type operations (read and list), the only ones
    /// that may be answered with `304 Not Modified`.
    pub fn is_read(self) -> bool {
        matches!(self, Self::Read | Self::List)
    }

    /// Maps an HTTP method onto an operation.
    ///
    /// `GET`/`HEAD` become [`Operation::List`] when `list` is set and
    /// [`Operation::Read`] otherwise. `POST`/`PUT` become
    /// [`Operation::Update`] when the target already `exists`, else
    /// [`Operation::Create`]. `LIST` is accepted as a verb on its own.
    pub fn from_http_method(method: &str, list: bool, exists: bool) -> Result<Self, UnknownOperation> {
        match method.to_ascii_uppercase().as_str() {
            "GET" | "HEAD" if list => Ok(Self::List),
            "GET" | "HEAD" => Ok(Self::Read),
            "LIST" => Ok(Self::List),
            "POST" | "PUT" if exists => Ok(Self::Update),
            "POST" | "PUT" => Ok(Self::Create),
            "DELETE" => Ok(Self::Delete),
            _ => Err(UnknownOperation(method.to_owned())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "list" => Ok(Self::List),
            _ => Err(UnknownOperation(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_round_trips_through_str() {
        for op in [
            Operation::Create,
            Operation::Read,
            Operation::Update,
            Operation::Delete,
            Operation::List,
        ] {
            assert_eq!(op.as_str().parse::<Operation>(), Ok(op));
        }
        assert!("patch".parse::<Operation>().is_err());
    }

    #[test]
    fn http_method_mapping() {
        assert_eq!(Operation::from_http_method("GET", false, true), Ok(Operation::Read));
        assert_eq!(Operation::from_http_method("get", true, true), Ok(Operation::List));
        assert_eq!(Operation::from_http_method("LIST", false, false), Ok(Operation::List));
        assert_eq!(Operation::from_http_method("PUT", false, false), Ok(Operation::Create));
        assert_eq!(Operation::from_http_method("POST", false, true), Ok(Operation::Update));
        assert_eq!(Operation::from_http_method("DELETE", false, true), Ok(Operation::Delete));
        assert!(Operation::from_http_method("TRACE", false, false).is_err());
    }

    #[test]
    fn status_display() {
        assert_eq!(StatusCode::PreconditionFailed.to_string(), "412 Precondition Failed");
        assert!(StatusCode::NoContent.is_success());
        assert!(!StatusCode::NotModified.is_success());
    }
}
