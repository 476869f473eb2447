//! Cache entry operations.
//!
//! Entries are JSON documents keyed by [`compute_cache_key`](super::hash::compute_cache_key).
//! Expiry is lazy: a read that finds a stale row deletes it and reports a miss.

use super::connection::CacheStore;
use crate::Error;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_rusqlite::{params, rusqlite};

/// Aggregate numbers about the cache contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub total_bytes: u64,
    pub ttl_seconds: u64,
}

enum Lookup {
    Hit(Value),
    Missing,
    Expired,
    Corrupted(String),
}

impl CacheStore {
    fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    /// Get a cached value by key.
    ///
    /// Returns None if the key doesn't exist, if the entry is older than the
    /// TTL, or if the stored value is corrupted. Stale and corrupted rows are
    /// deleted as part of the read.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        let key = key.to_string();
        let ttl_ms = self.ttl_millis();
        let now = Utc::now().timestamp_millis();

        let lookup = self
            .conn
            .call(move |conn| -> Result<Lookup, Error> {
                let row = conn.query_row(
                    "SELECT value_json, stored_at FROM api_cache WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                );

                let (value_json, stored_at) = match row {
                    Ok(found) => found,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(Lookup::Missing),
                    Err(rusqlite::Error::InvalidColumnType(_, _, kind)) => {
                        conn.execute("DELETE FROM api_cache WHERE key = ?1", params![key])?;
                        return Ok(Lookup::Corrupted(format!("unexpected column type {kind}")));
                    }
                    Err(e) => return Err(e.into()),
                };

                if now.saturating_sub(stored_at) > ttl_ms {
                    conn.execute("DELETE FROM api_cache WHERE key = ?1", params![key])?;
                    return Ok(Lookup::Expired);
                }

                match serde_json::from_str(&value_json) {
                    Ok(value) => Ok(Lookup::Hit(value)),
                    Err(e) => {
                        conn.execute("DELETE FROM api_cache WHERE key = ?1", params![key])?;
                        Ok(Lookup::Corrupted(e.to_string()))
                    }
                }
            })
            .await
            .map_err(Error::from)?;

        match lookup {
            Lookup::Hit(value) => Ok(Some(value)),
            Lookup::Missing => Ok(None),
            Lookup::Expired => {
                tracing::debug!("cache entry expired and evicted");
                Ok(None)
            }
            Lookup::Corrupted(reason) => {
                tracing::warn!(%reason, "corrupted cache entry removed");
                Ok(None)
            }
        }
    }

    /// Insert or replace a cached value.
    ///
    /// The write is a single UPSERT statement, so concurrent readers observe
    /// either the previous value or the new one.
    pub async fn set(&self, key: &str, endpoint: &str, value: &Value) -> Result<(), Error> {
        let key = key.to_string();
        let endpoint = endpoint.to_string();
        let value_json = serde_json::to_string(value)?;
        let stored_at = Utc::now().timestamp_millis();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO api_cache (key, endpoint, value_json, stored_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        endpoint = excluded.endpoint,
                        value_json = excluded.value_json,
                        stored_at = excluded.stored_at",
                    params![key, endpoint, value_json, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a single entry. Returns true if a row was removed.
    pub async fn delete(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM api_cache WHERE key = ?1", params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry. Returns the number of deleted entries.
    pub async fn clear(&self) -> Result<u64, Error> {
        let deleted = self
            .conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM api_cache", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)?;

        tracing::info!(deleted, "cleared response cache");
        Ok(deleted)
    }

    /// Delete entries older than the TTL.
    ///
    /// Returns the number of deleted entries.
    pub async fn cleanup_expired(&self) -> Result<u64, Error> {
        let cutoff = Utc::now().timestamp_millis().saturating_sub(self.ttl_millis());
        let deleted = self
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM api_cache WHERE stored_at < ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)?;

        if deleted > 0 {
            tracing::info!(deleted, "cleaned up expired cache entries");
        }
        Ok(deleted)
    }

    /// Entry count and stored payload size.
    pub async fn stats(&self) -> Result<CacheStats, Error> {
        let ttl_seconds = self.ttl.as_secs();
        self.conn
            .call(move |conn| -> Result<CacheStats, Error> {
                let (entries, total_bytes): (i64, i64) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(LENGTH(value_json)), 0) FROM api_cache",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                Ok(CacheStats { entries: entries as u64, total_bytes: total_bytes as u64, ttl_seconds })
            })
            .await
            .map_err(Error::from)
    }
}
