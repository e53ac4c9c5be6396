use once_cell::sync::Lazy;

use crate::crypto::password;
use crate::error::{AppError, Result};
use crate::models::fingerprint::ClientFingerprint;
use crate::models::session::{IssuedSession, SessionIdentity};
use crate::models::user::User;
use crate::repositories::user::UserDirectory;
use crate::services::session::SessionManager;

/// Verified against when no user matches, so unknown usernames cost the same as wrong passwords.
static DUMMY_PASSWORD_HASH: Lazy<Option<String>> =
    Lazy::new(|| password::hash_password("no-such-user-placeholder").ok());

/// Authenticates a user by username and password.
///
/// # Arguments
///
/// * `users` - The user directory.
/// * `username` - The user's username.
/// * `password` - The user's password.
///
/// # Returns
///
/// A `Result` containing the authenticated `User`. Unknown users, inactive
/// users and wrong passwords produce the same error.
pub async fn authenticate_user(
    users: &dyn UserDirectory,
    username: &str,
    password: &str,
) -> Result<User> {
    tracing::debug!("🔐 Authenticating user: {}", username);

    let Some(user) = users
        .find_by_username(username)
        .await?
        .filter(|user| user.is_active)
    else {
        if let Some(hash) = DUMMY_PASSWORD_HASH.as_deref() {
            password::verify_password(password, hash)?;
        }
        return Err(AppError::Authentication(
            "Invalid username or password".to_string(),
        ));
    };

    if !password::verify_password(password, &user.password_hash)? {
        return Err(AppError::Authentication(
            "Invalid username or password".to_string(),
        ));
    }

    tracing::info!("✅ User authenticated: {}", user.id);

    Ok(user)
}

/// Checks credentials and starts a session bound to the calling client.
pub async fn login(
    users: &dyn UserDirectory,
    sessions: &SessionManager,
    username: &str,
    password: &str,
    fingerprint: ClientFingerprint,
) -> Result<IssuedSession> {
    let user = authenticate_user(users, username, password).await?;

    let issued = sessions
        .issue(
            SessionIdentity {
                user_id: user.id,
                role: user.role,
            },
            fingerprint,
        )
        .await?;

    tracing::info!("✅ User {} logged in with role {}", user.username, user.role);
    Ok(issued)
}
