//! The session lifecycle: issue, validate, revoke.
//!
//! A session moves `ISSUED -> ACTIVE -> {EXPIRED | REVOKED | LOGGED_OUT}`.
//! `ACTIVE` is re-entrant: each successful validation slides the expiry
//! window forward, never past `issued_at + max_lifetime`. Terminal states are
//! all "absent from the store"; only the error returned tells them apart.
//!
//! The signature is always verified before the store is touched, and the
//! fingerprint is compared only after every other validity check passed.

use std::sync::Arc;

use chrono::Duration;

use crate::clock::Clock;
use crate::crypto::session_id::SessionId;
use crate::crypto::signer::Signer;
use crate::error::SessionError;
use crate::models::fingerprint::ClientFingerprint;
use crate::models::session::{AuthenticatedSession, IssuedSession, SessionIdentity, SessionRecord};
use crate::models::user::Role;
use crate::repositories::session::SessionStore;
use crate::repositories::user::UserDirectory;

/// Where the role checked on each request comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolePolicy {
    /// The role captured at login is used for the whole session.
    CapturedAtIssue,
    /// The role is looked up again on every validation.
    ResolvedAtValidation,
}

/// Timing and role rules shared by every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Idle window, reset on every successful validation.
    pub sliding_ttl: Duration,
    /// Hard cap on session age regardless of activity.
    pub max_lifetime: Duration,
    pub role_policy: RolePolicy,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            sliding_ttl: Duration::hours(1),
            max_lifetime: Duration::hours(24),
            role_policy: RolePolicy::CapturedAtIssue,
        }
    }
}

/// Extracts the credentials from an `Authorization: Bearer <value>` header.
///
/// The scheme is matched case-insensitively.
pub fn parse_bearer(authorization: Option<&str>) -> Result<&str, SessionError> {
    let value = authorization.ok_or(SessionError::MalformedHeader)?;
    let (scheme, credentials) = value
        .trim()
        .split_once(' ')
        .ok_or(SessionError::MalformedHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(SessionError::MalformedHeader);
    }

    let credentials = credentials.trim();
    if credentials.is_empty() {
        return Err(SessionError::MalformedHeader);
    }
    Ok(credentials)
}

/// Issues, validates and revokes sessions.
///
/// Holds no session state of its own; clones share the same collaborators.
#[derive(Clone)]
pub struct SessionManager {
    signer: Arc<Signer>,
    store: Arc<dyn SessionStore>,
    users: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    policy: SessionPolicy,
}

impl SessionManager {
    pub fn new(
        signer: Signer,
        store: Arc<dyn SessionStore>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            signer: Arc::new(signer),
            store,
            users,
            clock,
            policy,
        }
    }

    /// Starts a session for a user who just authenticated.
    ///
    /// # Arguments
    ///
    /// * `identity` - The user and the role to capture.
    /// * `fingerprint` - The fingerprint of the client logging in.
    ///
    /// # Returns
    ///
    /// The signed identifier to hand to the client.
    pub async fn issue(
        &self,
        identity: SessionIdentity,
        fingerprint: ClientFingerprint,
    ) -> Result<IssuedSession, SessionError> {
        let session_id = SessionId::generate();
        let now = self.clock.now();
        let ttl = self.policy.sliding_ttl.min(self.policy.max_lifetime);

        let record = SessionRecord {
            user_id: identity.user_id,
            role: identity.role,
            client_fingerprint: fingerprint,
            issued_at: now,
            expires_at: now + ttl,
        };

        self.store.put(&session_id, &record, ttl).await?;

        tracing::info!("✅ Session issued for user: {} ({})", identity.user_id, identity.role);

        Ok(IssuedSession {
            session_id: self.signer.sign(&session_id),
            identity,
            expires_at: record.expires_at,
            max_age_at: now + self.policy.max_lifetime,
        })
    }

    /// Checks a presented session and slides its expiry window.
    ///
    /// # Arguments
    ///
    /// * `authorization` - The raw `Authorization` header value, if any.
    /// * `fingerprint` - The fingerprint of the client presenting the session.
    /// * `required_roles` - Roles allowed to proceed. Empty means any role.
    ///
    /// # Errors
    ///
    /// Checks run in a fixed order and the first failure is returned:
    /// header, signature, presence, owner, role, lifetime, fingerprint.
    pub async fn validate(
        &self,
        authorization: Option<&str>,
        fingerprint: &ClientFingerprint,
        required_roles: &[Role],
    ) -> Result<AuthenticatedSession, SessionError> {
        let signed = parse_bearer(authorization)?;
        let session_id = self.signer.unsign(signed)?;

        let record = self
            .store
            .get(&session_id)
            .await?
            .ok_or(SessionError::SessionExpiredOrUnknown)?;

        let role = match self.resolve_role(&record).await? {
            Some(role) => role,
            None => {
                tracing::warn!("❌ Session owner {} no longer exists, revoking", record.user_id);
                self.store.delete(&session_id).await?;
                return Err(SessionError::UserNotFound);
            }
        };

        if !required_roles.is_empty() && !required_roles.contains(&role) {
            tracing::warn!("❌ Role {} of user {} not permitted here", role, record.user_id);
            return Err(SessionError::Forbidden);
        }

        let now = self.clock.now();
        let max_age_at = record.issued_at + self.policy.max_lifetime;
        if now > max_age_at {
            tracing::warn!("⏰ Session of user {} reached its maximum lifetime", record.user_id);
            self.store.delete(&session_id).await?;
            return Err(SessionError::SessionLifetimeExceeded);
        }

        if record.client_fingerprint != *fingerprint {
            tracing::warn!(
                "🚨 Fingerprint mismatch on session of user {}, revoking as hijacked",
                record.user_id
            );
            self.store.delete(&session_id).await?;
            return Err(SessionError::HijackingDetected);
        }

        let ttl = self.policy.sliding_ttl.min(max_age_at - now);
        if !self.store.refresh_ttl(&session_id, ttl).await? {
            // Revoked between the read and the refresh.
            return Err(SessionError::SessionExpiredOrUnknown);
        }

        tracing::debug!("✅ Session validated for user: {}", record.user_id);

        Ok(AuthenticatedSession {
            user_id: record.user_id,
            role,
            issued_at: record.issued_at,
            expires_at: now + ttl,
            max_age_at,
        })
    }

    /// Ends a session. Revoking an already absent session succeeds.
    ///
    /// # Errors
    ///
    /// Header and signature failures as for `validate`; the store is not
    /// touched when the signature does not verify.
    pub async fn revoke(&self, authorization: Option<&str>) -> Result<(), SessionError> {
        let signed = parse_bearer(authorization)?;
        let session_id = self.signer.unsign(signed)?;

        self.store.delete(&session_id).await?;
        tracing::info!("👋 Session revoked");
        Ok(())
    }

    /// Checks that the session store is reachable.
    pub async fn store_health(&self) -> Result<(), SessionError> {
        self.store.ping().await
    }

    async fn resolve_role(&self, record: &SessionRecord) -> Result<Option<Role>, SessionError> {
        match self.policy.role_policy {
            RolePolicy::CapturedAtIssue => {
                let exists = self
                    .users
                    .user_exists(record.user_id)
                    .await
                    .map_err(|e| SessionError::DirectoryUnavailable(e.to_string()))?;
                Ok(exists.then_some(record.role))
            }
            RolePolicy::ResolvedAtValidation => self
                .users
                .get_role(record.user_id)
                .await
                .map_err(|e| SessionError::DirectoryUnavailable(e.to_string())),
        }
    }
}
