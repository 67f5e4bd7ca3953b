pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::core::Puzzle;
use crate::error::Result;

pub use sqlite::SqliteCache;

/// Durable content-address → puzzle list store with lazy expiry.
///
/// Reads treat an expired entry as absent and delete it on the spot; there is
/// no background sweeper.
#[async_trait]
pub trait PuzzleCache: Send + Sync {
    /// True iff an unexpired entry exists for `address`
    async fn has(&self, address: &str) -> Result<bool>;

    /// Stored puzzles for `address`, if present and unexpired
    async fn get(&self, address: &str) -> Result<Option<Vec<Puzzle>>>;

    /// Store or wholesale replace the entry, stamped with the current time
    async fn put(&self, address: &str, puzzles: &[Puzzle]) -> Result<()>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;

    /// Number of stored entries, expired ones included
    async fn size(&self) -> Result<u64>;

    /// Delete every expired entry, returning how many went
    async fn cleanup_expired(&self) -> Result<u64>;

    /// Get cache statistics
    async fn stats(&self) -> Result<CacheStats>;

    /// Release the storage handle. Later calls fail with a cache error.
    async fn close(&self) -> Result<()>;
}

/// One stored entry
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub address: String,
    pub puzzles: Vec<Puzzle>,
    pub written_at: DateTime<Utc>,
}

impl CachedEntry {
    /// Expired once `now - written_at > ttl`
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        is_expired_at(self.written_at.timestamp_millis(), ttl, now)
    }
}

pub(crate) fn is_expired_at(written_at_ms: i64, ttl: Duration, now: DateTime<Utc>) -> bool {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now.timestamp_millis().saturating_sub(written_at_ms) > ttl_ms
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_entries: u64,
    pub expired_entries: u64,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let ttl = Duration::from_secs(60);
        let now = Utc::now();
        let entry = |age_ms: i64| CachedEntry {
            address: "a".into(),
            puzzles: Vec::new(),
            written_at: now - chrono::Duration::milliseconds(age_ms),
        };

        assert!(!entry(0).is_expired(ttl, now));
        assert!(!entry(60_000).is_expired(ttl, now));
        assert!(entry(60_001).is_expired(ttl, now));
    }
}
