use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::{
    handlers,
    middleware_layer::auth::{require_auth, RoleGuard},
    models::user::Role,
    state::AppState,
};

/// Roles allowed on the admin routes.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin];

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .with_state(state.clone());

    let session_routes = Router::new()
        .route("/api/auth/session", get(handlers::auth::session_info))
        .route_layer(from_fn_with_state(
            RoleGuard::any(state.clone()),
            require_auth,
        ))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/api/admin/store", get(handlers::admin::store_health))
        .route_layer(from_fn_with_state(
            RoleGuard::only(state.clone(), ADMIN_ROLES),
            require_auth,
        ))
        .with_state(state.clone());

    // Headers are left out of spans: they carry bearer credentials.
    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(admin_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
}
