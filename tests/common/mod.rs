#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use session_gate::clock::ManualClock;
use session_gate::crypto::password::hash_password;
use session_gate::crypto::session_id::SessionId;
use session_gate::crypto::signer::Signer;
use session_gate::error::{Result as AppResult, SessionError};
use session_gate::models::fingerprint::ClientFingerprint;
use session_gate::models::session::{SessionIdentity, SessionRecord};
use session_gate::models::user::{Role, User};
use session_gate::repositories::memory_session::MemorySessionStore;
use session_gate::repositories::session::SessionStore;
use session_gate::repositories::user::UserDirectory;
use session_gate::services::session::{RolePolicy, SessionManager, SessionPolicy};

pub const SECRET_KEY: &[u8] = b"test-secret-key-of-32-bytes-long";
pub const SALT: &str = "session-id";

/// Users held in memory, editable mid-test.
#[derive(Clone, Default)]
pub struct MemoryUserDirectory {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserDirectory {
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn remove(&self, user_id: Uuid) {
        self.users.write().await.remove(&user_id);
    }

    pub async fn set_role(&self, user_id: Uuid, role: Role) {
        if let Some(user) = self.users.write().await.get_mut(&user_id) {
            user.role = role;
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username && u.is_active)
            .cloned())
    }

    async fn user_exists(&self, user_id: Uuid) -> AppResult<bool> {
        Ok(self
            .users
            .read()
            .await
            .get(&user_id)
            .is_some_and(|u| u.is_active))
    }

    async fn get_role(&self, user_id: Uuid) -> AppResult<Option<Role>> {
        Ok(self
            .users
            .read()
            .await
            .get(&user_id)
            .filter(|u| u.is_active)
            .map(|u| u.role))
    }
}

/// A store that is always down and counts how often it was asked.
#[derive(Clone, Default)]
pub struct FailingStore {
    pub calls: Arc<AtomicUsize>,
}

impl FailingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> SessionError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        SessionError::StoreUnavailable("store is down".to_string())
    }
}

#[async_trait]
impl SessionStore for FailingStore {
    async fn put(&self, _: &SessionId, _: &SessionRecord, _: Duration) -> Result<(), SessionError> {
        Err(self.fail())
    }

    async fn get(&self, _: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
        Err(self.fail())
    }

    async fn refresh_ttl(&self, _: &SessionId, _: Duration) -> Result<bool, SessionError> {
        Err(self.fail())
    }

    async fn delete(&self, _: &SessionId) -> Result<(), SessionError> {
        Err(self.fail())
    }

    async fn ping(&self) -> Result<(), SessionError> {
        Err(self.fail())
    }
}

/// Deletes each record right after handing it out, as a concurrent logout would.
#[derive(Clone)]
pub struct RevokeAfterRead(pub MemorySessionStore);

#[async_trait]
impl SessionStore for RevokeAfterRead {
    async fn put(&self, id: &SessionId, record: &SessionRecord, ttl: Duration) -> Result<(), SessionError> {
        self.0.put(id, record, ttl).await
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
        let record = self.0.get(id).await?;
        self.0.delete(id).await?;
        Ok(record)
    }

    async fn refresh_ttl(&self, id: &SessionId, ttl: Duration) -> Result<bool, SessionError> {
        self.0.refresh_ttl(id, ttl).await
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        self.0.delete(id).await
    }

    async fn ping(&self) -> Result<(), SessionError> {
        self.0.ping().await
    }
}

pub fn signer() -> Signer {
    Signer::new(SECRET_KEY, SALT).unwrap()
}

pub fn fingerprint(label: &str) -> ClientFingerprint {
    ClientFingerprint::new(label)
}

pub fn user(username: &str, role: Role) -> User {
    User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        password_hash: String::new(),
        role,
        is_active: true,
    }
}

pub fn user_with_password(username: &str, password: &str, role: Role) -> User {
    User {
        password_hash: hash_password(password).unwrap(),
        ..user(username, role)
    }
}

pub fn identity(user: &User) -> SessionIdentity {
    SessionIdentity {
        user_id: user.id,
        role: user.role,
    }
}

pub fn bearer(signed: &str) -> String {
    format!("Bearer {}", signed)
}

/// Everything a session-manager test needs, on a frozen clock.
pub struct Harness {
    pub manager: SessionManager,
    pub store: MemorySessionStore,
    pub users: MemoryUserDirectory,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(SessionPolicy::default())
    }

    pub fn with_role_policy(role_policy: RolePolicy) -> Self {
        Self::with_policy(SessionPolicy {
            role_policy,
            ..SessionPolicy::default()
        })
    }

    pub fn with_policy(policy: SessionPolicy) -> Self {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap());
        let store = MemorySessionStore::new(Arc::new(clock.clone()));
        let users = MemoryUserDirectory::default();
        let manager = SessionManager::new(
            signer(),
            Arc::new(store.clone()),
            Arc::new(users.clone()),
            Arc::new(clock.clone()),
            policy,
        );

        Self {
            manager,
            store,
            users,
            clock,
        }
    }

    /// Registers a user and logs them in from `client`.
    pub async fn login(&self, role: Role, client: &str) -> (User, String) {
        let user = user(&format!("user{}", Uuid::new_v4().simple()), role);
        self.users.insert(user.clone()).await;
        let issued = self
            .manager
            .issue(identity(&user), fingerprint(client))
            .await
            .unwrap();
        (user, bearer(issued.session_id.as_str()))
    }
}
