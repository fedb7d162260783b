//! RFC 7232 precondition evaluation.
//!
//! [`evaluate`] applies the precedence of RFC 7232 §6 to a request's
//! conditional headers and the stored [`CacheEntry`]:
//!
//! | Step | Header                | Evaluated when                              | Decisive outcome              |
//! |------|-----------------------|---------------------------------------------|-------------------------------|
//! | 1    | `If-Match`            | present                                     | no tag matches → `Failed`     |
//! | 2    | `If-Unmodified-Since` | time checks on, `If-Match` absent           | entry newer → `Failed`        |
//! | 3    | `If-None-Match`       | present                                     | tag matches → `NotModified` for reads, `Failed` otherwise |
//! | 4    | `If-Modified-Since`   | time checks on, read operation, `If-None-Match` absent | entry not newer → `NotModified` |
//! | 5    | —                     | nothing above was decisive                  | `PassThrough`                 |
//!
//! Entity tags are compared as RFC 7232 §2.3 describes: `If-Match` uses the
//! strong comparison (a weak `W/` tag never matches), `If-None-Match` the
//! weak one, and `*` matches any existing entry.

use std::time::SystemTime;

use thiserror::Error;

use super::CacheEntry;
use crate::http::headers::{IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_UNMODIFIED_SINCE};
use crate::http::{Headers, Operation, StatusCode};

/// A date precondition header that is not a valid HTTP date.
#[derive(Debug, Error)]
#[error("malformed {header} header: {value:?}")]
pub struct MalformedDate {
    pub header: &'static str,
    pub value: String,
    #[source]
    source: httpdate::Error,
}

/// Outcome of evaluating a request's preconditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// No precondition was decisive; dispatch the request.
    PassThrough,
    /// The representation is unchanged; answer `304 Not Modified`.
    NotModified,
    /// A precondition failed; answer `412 Precondition Failed`.
    Failed,
}

impl Precondition {
    pub fn should_pass_through(self) -> bool {
        self == Self::PassThrough
    }

    /// `false` only when a precondition failed.
    pub fn condition_satisfied(self) -> bool {
        self != Self::Failed
    }

    /// Status of the short-circuit response, if there is one.
    pub fn status(self) -> Option<StatusCode> {
        match self {
            Self::PassThrough => None,
            Self::NotModified => Some(StatusCode::NotModified),
            Self::Failed => Some(StatusCode::PreconditionFailed),
        }
    }
}

/// Evaluates the conditional headers of a request against `entry`.
///
/// Date headers are only looked at when `check_time_headers` is set, and a
/// date header that is looked at but does not parse is an error.
pub fn evaluate(
    headers: &Headers,
    operation: Operation,
    entry: &CacheEntry,
    check_time_headers: bool,
) -> Result<Precondition, MalformedDate> {
    let if_match = headers.contains(IF_MATCH);
    if if_match && !headers.list_values(IF_MATCH).any(|tag| strong_match(tag, &entry.key)) {
        return Ok(Precondition::Failed);
    }

    if check_time_headers && !if_match {
        if let Some(since) = parse_date(headers, IF_UNMODIFIED_SINCE)? {
            if entry.date > since {
                return Ok(Precondition::Failed);
            }
        }
    }

    let if_none_match = headers.contains(IF_NONE_MATCH);
    if if_none_match && headers.list_values(IF_NONE_MATCH).any(|tag| weak_match(tag, &entry.key)) {
        return Ok(if operation.is_read() {
            Precondition::NotModified
        } else {
            Precondition::Failed
        });
    }

    if check_time_headers && operation.is_read() && !if_none_match {
        if let Some(since) = parse_date(headers, IF_MODIFIED_SINCE)? {
            if entry.date <= since {
                return Ok(Precondition::NotModified);
            }
        }
    }

    Ok(Precondition::PassThrough)
}

fn parse_date(headers: &Headers, name: &'static str) -> Result<Option<SystemTime>, MalformedDate> {
    let Some(raw) = headers.get(name) else {
        return Ok(None);
    };
    httpdate::parse_http_date(raw.trim())
        .map(Some)
        .map_err(|source| MalformedDate {
            header: name,
            value: raw.to_owned(),
            source,
        })
}

fn strong_match(listed: &str, key: &str) -> bool {
    listed == "*" || (!listed.starts_with("W/") && opaque_tag(listed) == opaque_tag(key))
}

fn weak_match(listed: &str, key: &str) -> bool {
    listed == "*" || opaque_tag(listed.trim_start_matches("W/")) == opaque_tag(key)
}

// Strips the surrounding quotes of an entity tag; bare values pass through.
fn opaque_tag(tag: &str) -> &str {
    tag.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(tag)
}
