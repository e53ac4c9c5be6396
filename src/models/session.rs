use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::session_id::SignedSessionId;
use crate::models::fingerprint::ClientFingerprint;
use crate::models::user::Role;

/// Server-side state of one session, stored under its raw identifier.
///
/// `issued_at` never changes. `expires_at` tracks the store key's deadline:
/// stores fill it in from the remaining TTL on every read, so a refresh moves
/// it without rewriting the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The ID of the user this session belongs to.
    pub user_id: Uuid,
    /// The role captured when the session was issued.
    pub role: Role,
    /// The client the session was issued to.
    pub client_fingerprint: ClientFingerprint,
    /// The timestamp when the session was created.
    pub issued_at: DateTime<Utc>,
    /// The timestamp when the session expires unless used again.
    pub expires_at: DateTime<Utc>,
}

/// The identity resolved from a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionIdentity {
    pub user_id: Uuid,
    pub role: Role,
}

/// A session that passed every check on the current request.
///
/// Inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    pub user_id: Uuid,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    /// The sliding deadline after this request's refresh.
    pub expires_at: DateTime<Utc>,
    /// The absolute deadline, `issued_at + max lifetime`.
    pub max_age_at: DateTime<Utc>,
}

impl AuthenticatedSession {
    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity {
            user_id: self.user_id,
            role: self.role,
        }
    }
}

/// The outcome of a successful login.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// The only form of the identifier handed to the client.
    pub session_id: SignedSessionId,
    pub identity: SessionIdentity,
    pub expires_at: DateTime<Utc>,
    pub max_age_at: DateTime<Utc>,
}
