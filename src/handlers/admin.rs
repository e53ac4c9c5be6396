use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::{error::Result, models::session::AuthenticatedSession, state::AppState};

/// The response payload for the store health check.
#[derive(Serialize)]
pub struct StoreHealthResponse {
    pub healthy: bool,
}

/// Reports whether the session store is reachable. Admin only.
#[axum::debug_handler(state = AppState)]
pub async fn store_health(
    State(state): State<AppState>,
    Extension(session): Extension<AuthenticatedSession>,
) -> Result<Json<StoreHealthResponse>> {
    tracing::info!("🩺 Store health requested by admin: {}", session.user_id);

    state.sessions.store_health().await?;

    Ok(Json(StoreHealthResponse { healthy: true }))
}
