use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;
use std::time::Duration;

use crate::cache::{is_expired_at, CacheStats, CachedEntry, PuzzleCache};
use crate::core::Puzzle;
use crate::error::{PuzzleEngineError, Result};

/// SQLite-backed puzzle cache.
///
/// ```sql
/// CREATE TABLE puzzle_cache (
///     address TEXT PRIMARY KEY,
///     puzzles TEXT NOT NULL,          -- JSON array of canonical puzzles
///     written_at INTEGER NOT NULL     -- unix millis
/// );
/// CREATE TABLE cache_index (
///     address TEXT PRIMARY KEY,
///     written_at INTEGER NOT NULL
/// );
/// ```
///
/// `cache_index` mirrors addresses and timestamps for maintenance; reads only
/// touch `puzzle_cache`.
pub struct SqliteCache {
    conn: Mutex<Option<Connection>>,
    ttl: Duration,
}

impl SqliteCache {
    /// Open (or create) the cache database at `db_path`. `:memory:` gives a
    /// throwaway in-process store.
    pub async fn new(db_path: &str, ttl: Duration) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS puzzle_cache (
                address TEXT PRIMARY KEY,
                puzzles TEXT NOT NULL,
                written_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS cache_index (
                address TEXT PRIMARY KEY,
                written_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_cache_index_written_at ON cache_index(written_at);",
        )?;

        tracing::debug!("Puzzle cache ready at {} (ttl {:?})", db_path, ttl);

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| PuzzleEngineError::Cache("cache lock poisoned".to_string()))?;
        let conn = guard
            .as_mut()
            .ok_or_else(|| PuzzleEngineError::Cache("cache is closed".to_string()))?;
        f(conn)
    }

    /// Store an entry with an explicit write time
    pub fn put_at(&self, address: &str, puzzles: &[Puzzle], written_at: DateTime<Utc>) -> Result<()> {
        let puzzles_json = serde_json::to_string(puzzles)?;
        let written_at = written_at.timestamp_millis();

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR REPLACE INTO puzzle_cache (address, puzzles, written_at) VALUES (?1, ?2, ?3)",
                params![address, puzzles_json, written_at],
            )?;
            tx.execute(
                "INSERT OR REPLACE INTO cache_index (address, written_at) VALUES (?1, ?2)",
                params![address, written_at],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Live entry for `address`; an expired one is deleted and reported absent
    pub fn entry(&self, address: &str) -> Result<Option<CachedEntry>> {
        let now = Utc::now();
        let ttl = self.ttl;

        self.with_conn(|conn| {
            let row: Option<(String, i64)> = conn
                .query_row(
                    "SELECT puzzles, written_at FROM puzzle_cache WHERE address = ?",
                    params![address],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((puzzles_json, written_at)) = row else {
                return Ok(None);
            };

            if is_expired_at(written_at, ttl, now) {
                tracing::debug!("Cache entry expired: {}", address);
                delete_address(conn, address)?;
                return Ok(None);
            }

            let puzzles: Vec<Puzzle> = serde_json::from_str(&puzzles_json)?;
            let written_at = DateTime::from_timestamp_millis(written_at).unwrap_or(now);

            Ok(Some(CachedEntry {
                address: address.to_string(),
                puzzles,
                written_at,
            }))
        })
    }
}

fn delete_address(conn: &mut Connection, address: &str) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM puzzle_cache WHERE address = ?", params![address])?;
    tx.execute("DELETE FROM cache_index WHERE address = ?", params![address])?;
    tx.commit()?;
    Ok(())
}

#[async_trait]
impl PuzzleCache for SqliteCache {
    async fn has(&self, address: &str) -> Result<bool> {
        Ok(self.entry(address)?.is_some())
    }

    async fn get(&self, address: &str) -> Result<Option<Vec<Puzzle>>> {
        Ok(self.entry(address)?.map(|entry| entry.puzzles))
    }

    async fn put(&self, address: &str, puzzles: &[Puzzle]) -> Result<()> {
        self.put_at(address, puzzles, Utc::now())
    }

    async fn clear(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch("DELETE FROM puzzle_cache; DELETE FROM cache_index;")?;
            Ok(())
        })
    }

    async fn size(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: u64 = conn.query_row("SELECT COUNT(*) FROM puzzle_cache", [], |row| row.get(0))?;
            Ok(count)
        })
    }

    async fn cleanup_expired(&self) -> Result<u64> {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp_millis().saturating_sub(ttl_ms);

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let deleted = tx.execute(
                "DELETE FROM puzzle_cache WHERE address IN
                    (SELECT address FROM cache_index WHERE written_at < ?1)",
                params![cutoff],
            )?;
            tx.execute("DELETE FROM cache_index WHERE written_at < ?1", params![cutoff])?;
            tx.commit()?;
            Ok(deleted as u64)
        })
    }

    async fn stats(&self) -> Result<CacheStats> {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp_millis().saturating_sub(ttl_ms);

        self.with_conn(|conn| {
            let (total_entries, expired_entries, oldest, newest): (u64, u64, Option<i64>, Option<i64>) =
                conn.query_row(
                    "SELECT COUNT(*),
                            COALESCE(SUM(CASE WHEN written_at < ?1 THEN 1 ELSE 0 END), 0),
                            MIN(written_at),
                            MAX(written_at)
                     FROM cache_index",
                    params![cutoff],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )?;

            Ok(CacheStats {
                total_entries,
                expired_entries,
                oldest_entry: oldest.and_then(DateTime::from_timestamp_millis),
                newest_entry: newest.and_then(DateTime::from_timestamp_millis),
            })
        })
    }

    async fn close(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| PuzzleEngineError::Cache("cache lock poisoned".to_string()))?
            .take();

        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| PuzzleEngineError::Database(e))?;
            tracing::debug!("Puzzle cache closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(3600);

    fn fork(id: &str) -> Puzzle {
        Puzzle::new(id, "8/8/8/8/8/8/8/8 w - - 0 1", "e2e4 e7e5", 1500).with_themes(["fork"])
    }

    #[tokio::test]
    async fn test_cache_create() {
        let cache = SqliteCache::new(":memory:", TTL).await.unwrap();
        assert_eq!(cache.size().await.unwrap(), 0);
        assert_eq!(cache.stats().await.unwrap().total_entries, 0);
    }

    #[tokio::test]
    async fn test_cache_put_and_get() {
        let cache = SqliteCache::new(":memory:", TTL).await.unwrap();
        let puzzles = vec![fork("a"), fork("b")];

        cache.put("addr/1", &puzzles).await.unwrap();

        assert!(cache.has("addr/1").await.unwrap());
        assert_eq!(cache.get("addr/1").await.unwrap(), Some(puzzles));
        assert_eq!(cache.get("addr/2").await.unwrap(), None);
        assert!(!cache.has("addr/2").await.unwrap());
    }

    #[tokio::test]
    async fn test_cache_put_replaces_wholesale() {
        let cache = SqliteCache::new(":memory:", TTL).await.unwrap();

        cache.put("addr", &[fork("a"), fork("b")]).await.unwrap();
        cache.put("addr", &[fork("c")]).await.unwrap();

        assert_eq!(cache.get("addr").await.unwrap(), Some(vec![fork("c")]));
        assert_eq!(cache.size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cache_empty_list_is_a_hit() {
        let cache = SqliteCache::new(":memory:", TTL).await.unwrap();
        cache.put("empty", &[]).await.unwrap();
        assert_eq!(cache.get("empty").await.unwrap(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_expired_entry_is_deleted_on_read() {
        let cache = SqliteCache::new(":memory:", TTL).await.unwrap();
        let stale = Utc::now() - chrono::Duration::hours(2);

        cache.put_at("old", &[fork("a")], stale).unwrap();
        cache.put("fresh", &[fork("b")]).await.unwrap();
        assert_eq!(cache.size().await.unwrap(), 2);
        assert_eq!(cache.stats().await.unwrap().expired_entries, 1);

        assert_eq!(cache.get("old").await.unwrap(), None);
        assert_eq!(cache.size().await.unwrap(), 1);

        cache.put_at("old", &[fork("a")], stale).unwrap();
        assert!(!cache.has("old").await.unwrap());
        assert_eq!(cache.size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cache_cleanup_expired() {
        let cache = SqliteCache::new(":memory:", TTL).await.unwrap();
        let stale = Utc::now() - chrono::Duration::days(1);

        cache.put_at("old1", &[fork("a")], stale).unwrap();
        cache.put_at("old2", &[fork("b")], stale).unwrap();
        cache.put("fresh", &[fork("c")]).await.unwrap();

        assert_eq!(cache.cleanup_expired().await.unwrap(), 2);

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.expired_entries, 0);
        assert!(stats.oldest_entry.is_some());
        assert!(stats.newest_entry.is_some());
    }

    #[tokio::test]
    async fn test_cache_clear() {
        let cache = SqliteCache::new(":memory:", TTL).await.unwrap();
        cache.put("a", &[fork("a")]).await.unwrap();
        cache.put("b", &[fork("b")]).await.unwrap();

        cache.clear().await.unwrap();

        assert_eq!(cache.size().await.unwrap(), 0);
        assert_eq!(cache.stats().await.unwrap().total_entries, 0);
    }

    #[tokio::test]
    async fn test_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let path = path.to_str().unwrap();

        let cache = SqliteCache::new(path, TTL).await.unwrap();
        cache.put("addr", &[fork("a")]).await.unwrap();
        cache.close().await.unwrap();

        let reopened = SqliteCache::new(path, TTL).await.unwrap();
        assert_eq!(reopened.get("addr").await.unwrap(), Some(vec![fork("a")]));
    }

    #[tokio::test]
    async fn test_closed_cache_errors() {
        let cache = SqliteCache::new(":memory:", TTL).await.unwrap();
        cache.close().await.unwrap();
        cache.close().await.unwrap();

        assert!(matches!(cache.get("a").await, Err(PuzzleEngineError::Cache(_))));
        assert!(matches!(cache.put("a", &[]).await, Err(PuzzleEngineError::Cache(_))));
    }
}
