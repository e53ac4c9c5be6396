use garde::Validate;
use serde::Deserialize;

use crate::error::{AppError, Result};

/// The request payload for user login.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[garde(length(min = 3, max = 255), custom(validate_username))]
    pub username: String,
    #[garde(length(min = 1, max = 128))]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validates the characters of a username.
fn validate_username(username: &str, _ctx: &()) -> garde::Result {
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(garde::Error::new(
            "can only contain letters, numbers, underscores, and hyphens",
        ));
    }
    Ok(())
}

/// Validates a login payload.
///
/// # Returns
///
/// A `Result<()>` carrying every violation in one message.
pub fn validate_login(payload: &LoginRequest) -> Result<()> {
    payload
        .validate()
        .map_err(|report| AppError::Validation(report.to_string()))
}
