use axum::{
    extract::State,
    http::HeaderMap,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::Result,
    middleware_layer::auth::authorization_header,
    models::{
        fingerprint::ClientFingerprint,
        session::{AuthenticatedSession, SessionIdentity},
    },
    services::auth as auth_service,
    state::AppState,
    validation::auth::{validate_login, LoginRequest},
};

/// The response payload for a successful login.
#[derive(Serialize)]
pub struct LoginResponse {
    /// The signed session identifier to send as `Authorization: Bearer <session_id>`.
    pub session_id: String,
    pub identity: SessionIdentity,
    pub expires_at: DateTime<Utc>,
    pub max_age_at: DateTime<Utc>,
}

/// The response payload for logout.
#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// Timestamps describing a live session.
#[derive(Serialize)]
pub struct SessionHealth {
    pub issued_at: DateTime<Utc>,
    pub expires_next: DateTime<Utc>,
    pub max_age_at: DateTime<Utc>,
}

/// The response payload for session inspection.
#[derive(Serialize)]
pub struct SessionInfo {
    pub owner: SessionIdentity,
    pub health: SessionHealth,
}

/// Handles user login.
#[axum::debug_handler(state = AppState)]
pub async fn login(
    State(state): State<AppState>,
    fingerprint: ClientFingerprint,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    tracing::info!("🔐 Login attempt - Payload: {:?}", payload);
    validate_login(&payload)?;

    let issued = auth_service::login(
        state.users.as_ref(),
        &state.sessions,
        &payload.username,
        &payload.password,
        fingerprint,
    )
    .await?;

    Ok(Json(LoginResponse {
        session_id: issued.session_id.into_inner(),
        identity: issued.identity,
        expires_at: issued.expires_at,
        max_age_at: issued.max_age_at,
    }))
}

/// Handles user logout.
///
/// Succeeds again for a session that is already gone.
#[axum::debug_handler(state = AppState)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>> {
    let authorization = authorization_header(&headers)?;
    state.sessions.revoke(authorization).await?;

    Ok(Json(LogoutResponse {
        success: true,
        message: "You have been logged out successfully".to_string(),
    }))
}

/// Returns the identity and timestamps of the current session.
#[axum::debug_handler]
pub async fn session_info(
    Extension(session): Extension<AuthenticatedSession>,
) -> Json<SessionInfo> {
    Json(SessionInfo {
        owner: session.identity(),
        health: SessionHealth {
            issued_at: session.issued_at,
            expires_next: session.expires_at,
            max_age_at: session.max_age_at,
        },
    })
}
