use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{header, request::Parts, Extensions, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::{
    error::SessionError,
    models::{fingerprint::ClientFingerprint, user::Role},
    state::AppState,
};

/// Extracts the peer IP address from the request extensions.
///
/// Present only when the server was started with connect info.
pub fn peer_ip(extensions: &Extensions) -> Option<IpAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
}

/// Reads the `Authorization` header.
///
/// # Returns
///
/// `Ok(None)` when absent, `MalformedHeader` when it is not visible ASCII.
pub fn authorization_header(headers: &HeaderMap) -> Result<Option<&str>, SessionError> {
    headers
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| SessionError::MalformedHeader))
        .transpose()
}

impl FromRequestParts<AppState> for ClientFingerprint {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(state
            .fingerprint
            .derive(&parts.headers, peer_ip(&parts.extensions)))
    }
}

/// The roles a group of routes accepts, paired with the state needed to check them.
#[derive(Clone)]
pub struct RoleGuard {
    state: AppState,
    allowed: &'static [Role],
}

impl RoleGuard {
    /// Admits any authenticated session.
    pub fn any(state: AppState) -> Self {
        Self { state, allowed: &[] }
    }

    /// Admits only sessions holding one of `allowed`.
    pub fn only(state: AppState, allowed: &'static [Role]) -> Self {
        Self { state, allowed }
    }
}

/// A middleware that requires a valid session holding an allowed role.
///
/// # Arguments
///
/// * `guard` - The application state and the roles accepted by these routes.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// The downstream `Response`, with the `AuthenticatedSession` in the request
/// extensions, or a 401/403 rejection.
pub async fn require_auth(
    State(guard): State<RoleGuard>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, SessionError> {
    let fingerprint = guard
        .state
        .fingerprint
        .derive(request.headers(), peer_ip(request.extensions()));

    let authorization = authorization_header(request.headers())?;
    let session = guard
        .state
        .sessions
        .validate(authorization, &fingerprint, guard.allowed)
        .await?;

    tracing::debug!("✅ User authenticated: {} ({})", session.user_id, session.role);

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
