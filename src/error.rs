use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Reasons a session operation can fail.
///
/// The distinctions are for logging only. At the HTTP boundary every variant
/// collapses into a fixed 401, 403 or 503 body so that clients cannot tell an
/// expired session from one that never existed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The `Authorization` header is missing or does not use the `Bearer` scheme.
    #[error("missing or malformed Authorization header")]
    MalformedHeader,

    /// The bearer value cannot be split into an identifier and a signature.
    #[error("malformed session token")]
    MalformedToken,

    /// The signature does not verify against any accepted key.
    #[error("invalid session signature")]
    InvalidSignature,

    /// No live record exists for the identifier.
    #[error("session expired or unknown")]
    SessionExpiredOrUnknown,

    /// The session owner no longer exists.
    #[error("session owner no longer exists")]
    UserNotFound,

    /// The session role is not permitted for the requested capability.
    #[error("role not permitted")]
    Forbidden,

    /// The session outlived its absolute lifetime.
    #[error("session lifetime exceeded")]
    SessionLifetimeExceeded,

    /// The presenting client does not match the one the session was issued to.
    #[error("client fingerprint mismatch")]
    HijackingDetected,

    /// The session store could not be reached.
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),

    /// The user directory could not be reached.
    #[error("user directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

impl SessionError {
    /// Returns the HTTP status this failure maps to at the transport boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SessionError::MalformedHeader
            | SessionError::MalformedToken
            | SessionError::InvalidSignature
            | SessionError::SessionExpiredOrUnknown
            | SessionError::UserNotFound
            | SessionError::SessionLifetimeExceeded => StatusCode::UNAUTHORIZED,
            SessionError::Forbidden | SessionError::HijackingDetected => StatusCode::FORBIDDEN,
            SessionError::StoreUnavailable(_) | SessionError::DirectoryUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    /// Returns `true` for infrastructure outages as opposed to session failures.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            SessionError::StoreUnavailable(_) | SessionError::DirectoryUnavailable(_)
        )
    }

    fn public_message(&self) -> &'static str {
        match self {
            SessionError::MalformedHeader => "Authentication required",
            SessionError::Forbidden | SessionError::HijackingDetected => "Access denied",
            SessionError::StoreUnavailable(_) | SessionError::DirectoryUnavailable(_) => {
                "Service temporarily unavailable"
            }
            _ => "Invalid or expired session",
        }
    }
}

impl From<redis::RedisError> for SessionError {
    fn from(e: redis::RedisError) -> Self {
        SessionError::StoreUnavailable(e.to_string())
    }
}

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A session failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A connection pool construction error.
    #[error("Pool creation error: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    /// A column was missing or had the wrong type.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// An authentication error.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        // Rejections are logged with their context where they are decided.
        if self.is_infrastructure() {
            tracing::error!("❌ Session check failed: {}", self);
        } else {
            tracing::debug!("Session rejected: {}", self);
        }

        let status = self.status_code();
        let mut response = (status, error_body(self.public_message())).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Session(e) => return e.into_response(),

            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable".to_string())
            }

            AppError::CreatePool(ref e) => {
                tracing::error!("Pool creation error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::MissingData(ref column) => {
                tracing::error!("Missing data in column: {}", column);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Authentication(ref msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                (StatusCode::UNAUTHORIZED, msg.clone())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, error_body(&message)).into_response()
    }
}

fn error_body(message: &str) -> String {
    sonic_rs::to_string(&sonic_rs::json!({
        "error": message
    }))
    .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string())
}
