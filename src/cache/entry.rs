//! The persisted cache record.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::storage::StorageError;

/// Fingerprint and write time of a cacheable resource.
///
/// `date` is kept at whole-second resolution, the resolution of HTTP dates,
/// so comparisons against `If-Modified-Since` and friends behave the same
/// before and after a round trip through storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub date: SystemTime,
}

#[derive(Serialize, Deserialize)]
struct Persisted {
    key: String,
    date: u64,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_date(key, SystemTime::now())
    }

    pub fn with_date(key: impl Into<String>, date: SystemTime) -> Self {
        Self {
            key: key.into(),
            date: UNIX_EPOCH + Duration::from_secs(unix_secs(date)),
        }
    }

    pub(crate) fn encode(&self) -> Result<Bytes, serde_json::Error> {
        let persisted = Persisted {
            key: self.key.clone(),
            date: unix_secs(self.date),
        };
        serde_json::to_vec(&persisted).map(Bytes::from)
    }

    pub(crate) fn decode(storage_key: &str, raw: &[u8]) -> Result<Self, StorageError> {
        let persisted: Persisted =
            serde_json::from_slice(raw).map_err(|e| StorageError::Corrupt {
                key: storage_key.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            key: persisted.key,
            date: UNIX_EPOCH + Duration::from_secs(persisted.date),
        })
    }
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_is_truncated_to_seconds() {
        let date = UNIX_EPOCH + Duration::from_millis(1_700_000_000_750);
        let entry = CacheEntry::with_date("k", date);
        assert_eq!(entry.date, UNIX_EPOCH + Duration::from_secs(1_700_000_000));
    }

    #[test]
    fn decode_reads_what_encode_wrote() {
        let entry = CacheEntry::with_date("abc123", UNIX_EPOCH + Duration::from_secs(42));
        let raw = entry.encode().unwrap();
        assert_eq!(CacheEntry::decode("cache/x", &raw).unwrap(), entry);
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let err = CacheEntry::decode("cache/x", b"not json").unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { ref key, .. } if key == "cache/x"));
    }
}
