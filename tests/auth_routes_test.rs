mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use session_gate::models::fingerprint::FingerprintPolicy;
use session_gate::models::user::Role;
use session_gate::routes;
use session_gate::state::AppState;

use common::{user_with_password, Harness};

const BROWSER: &str = "Mozilla/5.0 (X11; Linux x86_64) Firefox/131.0";
const OTHER_BROWSER: &str = "curl/8.5.0";
const PASSWORD: &str = "correct horse battery staple";

struct TestApp {
    router: Router,
    harness: Harness,
}

impl TestApp {
    fn new() -> Self {
        let harness = Harness::new();
        let state = AppState::from_parts(
            harness.manager.clone(),
            Arc::new(harness.users.clone()),
            FingerprintPolicy::default(),
        );

        Self {
            router: routes::app(state),
            harness,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn login(&self, username: &str, password: &str) -> Response {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::USER_AGENT, BROWSER)
                .body(Body::from(
                    json!({ "username": username, "password": password }).to_string(),
                ))
                .unwrap(),
        )
        .await
    }

    /// Registers a user and returns their signed session id.
    async fn signed_in(&self, username: &str, role: Role) -> String {
        self.harness
            .users
            .insert(user_with_password(username, PASSWORD, role))
            .await;

        let response = self.login(username, PASSWORD).await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await["session_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn get(&self, uri: &str, session_id: Option<&str>, user_agent: &str) -> Response {
        let mut request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::USER_AGENT, user_agent);
        if let Some(session_id) = session_id {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", session_id));
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    async fn logout(&self, session_id: &str) -> Response {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/logout")
                .header(header::AUTHORIZATION, format!("Bearer {}", session_id))
                .header(header::USER_AGENT, BROWSER)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

async fn json_body(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn login_then_inspect_session() {
    let app = TestApp::new();
    app.harness
        .users
        .insert(user_with_password("alice", PASSWORD, Role::Developer))
        .await;

    let response = app.login("alice", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let login = json_body(response).await;
    assert_eq!(login["identity"]["role"], "developer");
    assert!(login["expires_at"].is_string());
    assert!(login["max_age_at"].is_string());

    let session_id = login["session_id"].as_str().unwrap();
    let response = app.get("/api/auth/session", Some(session_id), BROWSER).await;
    assert_eq!(response.status(), StatusCode::OK);

    let info = json_body(response).await;
    assert_eq!(info["owner"], login["identity"]);
    assert_eq!(info["health"]["max_age_at"], login["max_age_at"]);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new();
    app.harness
        .users
        .insert(user_with_password("bob", PASSWORD, Role::User))
        .await;

    let wrong = app.login("bob", "not the password").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let unknown = app.login("nobody", PASSWORD).await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_bytes(wrong).await, body_bytes(unknown).await);
}

#[tokio::test]
async fn malformed_login_payload_is_rejected() {
    let app = TestApp::new();

    let response = app.login("a b", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_header_asks_for_bearer_credentials() {
    let app = TestApp::new();

    let response = app.get("/api/auth/session", None, BROWSER).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
}

#[tokio::test]
async fn tampered_and_unknown_sessions_are_indistinguishable() {
    let app = TestApp::new();
    let session_id = app.signed_in("carol", Role::User).await;

    let mut tampered = session_id.clone().into_bytes();
    let last = tampered.len() - 2;
    tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let forged = app.get("/api/auth/session", Some(&tampered), BROWSER).await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);

    app.logout(&session_id).await;
    let gone = app.get("/api/auth/session", Some(&session_id), BROWSER).await;
    assert_eq!(gone.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(body_bytes(forged).await, body_bytes(gone).await);
}

#[tokio::test]
async fn another_client_presenting_the_session_is_refused() {
    let app = TestApp::new();
    let session_id = app.signed_in("dave", Role::User).await;

    let stolen = app.get("/api/auth/session", Some(&session_id), OTHER_BROWSER).await;
    assert_eq!(stolen.status(), StatusCode::FORBIDDEN);

    let original = app.get("/api/auth/session", Some(&session_id), BROWSER).await;
    assert_eq!(original.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_the_admin_role() {
    let app = TestApp::new();
    let guest = app.signed_in("erin", Role::Guest).await;
    let admin = app.signed_in("frank", Role::Admin).await;

    let refused = app.get("/api/admin/store", Some(&guest), BROWSER).await;
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);

    let allowed = app.get("/api/admin/store", Some(&admin), BROWSER).await;
    assert_eq!(allowed.status(), StatusCode::OK);
    assert_eq!(json_body(allowed).await["healthy"], true);

    let still_valid = app.get("/api/auth/session", Some(&guest), BROWSER).await;
    assert_eq!(still_valid.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_twice_then_session_is_gone() {
    let app = TestApp::new();
    let session_id = app.signed_in("grace", Role::User).await;

    let first = app.logout(&session_id).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(json_body(first).await["success"], true);

    let second = app.logout(&session_id).await;
    assert_eq!(second.status(), StatusCode::OK);

    let response = app.get("/api/auth/session", Some(&session_id), BROWSER).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_with_forged_session_is_unauthorized() {
    let app = TestApp::new();

    let response = app.logout("not-a-session.not-a-signature").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
