//! Cache layer configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration:
//!
//! ```json
//! {
//!   "enabled": true,
//!   "check_time_headers": true,
//!   "key_prefix": "cache/",
//!   "emit_etag": true
//! }
//! ```

use serde::Deserialize;

const DEFAULT_KEY_PREFIX: &str = "cache/";

/// Cache layer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch. When off, every request continues untouched.
    pub enabled: bool,
    /// Evaluate `If-Modified-Since` and `If-Unmodified-Since`.
    pub check_time_headers: bool,
    /// Prefix of every storage key the cache writes.
    pub key_prefix: String,
    /// Attach an `Etag` header to pass-through and `304` responses.
    pub emit_etag: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_time_headers: true,
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
            emit_etag: true,
        }
    }
}

impl CacheConfig {
    /// Parses a configuration from JSON.
    ///
    /// `key_prefix` is checked when the cache store is built, not here.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
