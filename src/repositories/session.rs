use async_trait::async_trait;
use chrono::{Duration, Utc};
use redis::aio::ConnectionManager;

use crate::crypto::session_id::SessionId;
use crate::error::SessionError;
use crate::models::session::SessionRecord;

/// Key-value persistence for session records with per-key expiry.
///
/// Every operation is keyed by the raw identifier; stores never see signed values.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores a record that expires after `ttl` unless refreshed.
    async fn put(
        &self,
        session_id: &SessionId,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), SessionError>;

    /// Loads a live record. `expires_at` reflects the key's current deadline.
    async fn get(&self, session_id: &SessionId) -> Result<Option<SessionRecord>, SessionError>;

    /// Resets the remaining lifetime of a live key without touching its value.
    ///
    /// Returns `false` when the key is gone. A deleted key is never recreated.
    async fn refresh_ttl(&self, session_id: &SessionId, ttl: Duration)
        -> Result<bool, SessionError>;

    /// Removes a key. Removing an absent key is not an error.
    async fn delete(&self, session_id: &SessionId) -> Result<(), SessionError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), SessionError>;
}

/// Milliseconds for a Redis `PX`/`PEXPIRE` argument. Redis rejects zero.
fn ttl_millis(ttl: Duration) -> u64 {
    ttl.num_milliseconds().max(1) as u64
}

/// Session records in Redis, serialized as JSON under `<prefix><raw id>`.
#[derive(Clone)]
pub struct RedisSessionStore {
    redis: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    /// Creates a new `RedisSessionStore`.
    ///
    /// # Arguments
    ///
    /// * `redis` - A pooled Redis connection.
    /// * `prefix` - Prepended to every key, e.g. `auth:sessions:`.
    pub fn new(redis: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
        }
    }

    fn key(&self, session_id: &SessionId) -> String {
        format!("{}{}", self.prefix, session_id.as_str())
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(
        &self,
        session_id: &SessionId,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        let session_json = sonic_rs::to_string(record).map_err(|e| {
            SessionError::StoreUnavailable(format!("Session serialization failed: {}", e))
        })?;

        let _: () = redis::cmd("SET")
            .arg(self.key(session_id))
            .arg(&session_json)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut self.redis.clone())
            .await
            .map_err(|e| {
                tracing::error!("❌ Redis SET failed: {}", e);
                SessionError::from(e)
            })?;

        Ok(())
    }

    async fn get(&self, session_id: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
        let key = self.key(session_id);

        // GET and PTTL in one MULTI so the deadline belongs to the value read.
        let (session_json, pttl): (Option<String>, i64) = redis::pipe()
            .atomic()
            .cmd("GET")
            .arg(&key)
            .cmd("PTTL")
            .arg(&key)
            .query_async(&mut self.redis.clone())
            .await?;

        let Some(session_json) = session_json else {
            return Ok(None);
        };

        let mut record: SessionRecord = match sonic_rs::from_str(&session_json) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("❌ Dropping unreadable session record: {}", e);
                let _: () = redis::cmd("DEL")
                    .arg(&key)
                    .query_async(&mut self.redis.clone())
                    .await?;
                return Ok(None);
            }
        };

        // -1 (no expiry) cannot happen for keys written by `put`; keep the stored deadline then.
        if pttl >= 0 {
            record.expires_at = Utc::now() + Duration::milliseconds(pttl);
        }

        Ok(Some(record))
    }

    async fn refresh_ttl(
        &self,
        session_id: &SessionId,
        ttl: Duration,
    ) -> Result<bool, SessionError> {
        let updated: i64 = redis::cmd("PEXPIRE")
            .arg(self.key(session_id))
            .arg(ttl_millis(ttl))
            .query_async(&mut self.redis.clone())
            .await?;

        Ok(updated == 1)
    }

    async fn delete(&self, session_id: &SessionId) -> Result<(), SessionError> {
        let _: () = redis::cmd("DEL")
            .arg(self.key(session_id))
            .query_async(&mut self.redis.clone())
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), SessionError> {
        let _: String = redis::cmd("PING")
            .query_async(&mut self.redis.clone())
            .await?;

        Ok(())
    }
}
