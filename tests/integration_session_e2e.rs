use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use serde_json::json;

// Shared test context
struct TestContext {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

static REDIS_CLIENT: Lazy<redis::Client> = Lazy::new(|| {
    redis::Client::open("redis://127.0.0.1:6379/").unwrap()
});

impl TestContext {
    fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "http://127.0.0.1:3000".to_string(),
            username: std::env::var("E2E_USERNAME").unwrap_or_else(|_| "e2e_user".to_string()),
            password: std::env::var("E2E_PASSWORD").unwrap_or_else(|_| "SecurePass123!@#".to_string()),
        }
    }
}

async fn get_redis_conn() -> ConnectionManager {
    REDIS_CLIENT.get_connection_manager().await.unwrap()
}

fn store_key(session_id: &str) -> String {
    let raw = session_id.split('.').next().unwrap();
    format!("auth:sessions:{}", raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    #[ignore = "requires a running server, Redis and a seeded user"]
    async fn test_login_session_logout() {
        let context = TestContext::new();
        let mut con = get_redis_conn().await;

        // Step 1: Login
        let login_response = context.client.post(format!("{}/api/auth/login", context.base_url))
            .header("User-Agent", "session-gate-e2e")
            .json(&json!({
                "username": context.username,
                "password": context.password
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(login_response.status().as_u16(), 200, "Login failed");
        let login_body: Value = login_response.json().await.unwrap();
        let session_id = login_body["session_id"].as_str().unwrap().to_string();

        // Step 2: The store holds the raw id only, with a TTL
        let key = store_key(&session_id);
        let ttl: i64 = redis::cmd("PTTL").arg(&key).query_async(&mut con).await.unwrap();
        assert!(ttl > 0, "Session key missing or without TTL");

        // Step 3: Inspect the session
        let session_response = context.client.get(format!("{}/api/auth/session", context.base_url))
            .header("User-Agent", "session-gate-e2e")
            .bearer_auth(&session_id)
            .send()
            .await
            .unwrap();

        assert_eq!(session_response.status().as_u16(), 200, "Session check failed");
        let session_body: Value = session_response.json().await.unwrap();
        assert_eq!(session_body["owner"], login_body["identity"]);

        // Step 4: A different client is treated as a hijack
        let hijack_response = context.client.get(format!("{}/api/auth/session", context.base_url))
            .header("User-Agent", "somebody-else")
            .bearer_auth(&session_id)
            .send()
            .await
            .unwrap();

        assert_eq!(hijack_response.status().as_u16(), 403);
        let exists: bool = redis::cmd("EXISTS").arg(&key).query_async(&mut con).await.unwrap();
        assert!(!exists, "Hijacked session was not revoked");

        // Step 5: Logout stays successful for a revoked session
        let logout_response = context.client.post(format!("{}/api/auth/logout", context.base_url))
            .bearer_auth(&session_id)
            .send()
            .await
            .unwrap();

        assert_eq!(logout_response.status().as_u16(), 200, "Logout failed");
    }
}
