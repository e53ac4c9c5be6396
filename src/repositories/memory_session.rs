use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::clock::Clock;
use crate::crypto::session_id::SessionId;
use crate::error::SessionError;
use crate::models::session::SessionRecord;
use crate::repositories::session::SessionStore;

#[derive(Clone)]
struct Entry {
    record: SessionRecord,
    deadline: DateTime<Utc>,
}

/// An in-process session store with clock-driven expiry.
///
/// Expired entries are invisible immediately and reclaimed by `purge_expired`.
#[derive(Clone)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<SessionId, Entry>>>,
    clock: Arc<dyn Clock>,
}

impl MemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Removes every expired entry.
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.deadline > now);
        before - entries.len()
    }

    /// Number of entries held, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(
        &self,
        session_id: &SessionId,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        let deadline = self.clock.now() + ttl;
        let mut record = record.clone();
        record.expires_at = deadline;

        self.entries
            .write()
            .await
            .insert(session_id.clone(), Entry { record, deadline });
        Ok(())
    }

    async fn get(&self, session_id: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(session_id)
            .filter(|entry| entry.deadline > now)
            .map(|entry| entry.record.clone()))
    }

    async fn refresh_ttl(
        &self,
        session_id: &SessionId,
        ttl: Duration,
    ) -> Result<bool, SessionError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(session_id) else {
            return Ok(false);
        };

        if entry.deadline <= now {
            entries.remove(session_id);
            return Ok(false);
        }

        entry.deadline = now + ttl;
        entry.record.expires_at = entry.deadline;
        Ok(true)
    }

    async fn delete(&self, session_id: &SessionId) -> Result<(), SessionError> {
        self.entries.write().await.remove(session_id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), SessionError> {
        Ok(())
    }
}
