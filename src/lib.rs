//! Server-side session authentication.
//!
//! Clients receive an opaque, signed session identifier; all session state
//! lives in a store keyed by the unsigned identifier. Sessions slide on use,
//! are capped at an absolute lifetime, are bound to the issuing client's
//! fingerprint and can be revoked at any time.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;

pub mod crypto {
    pub mod password;
    pub mod session_id;
    pub mod signer;
}

pub mod models {
    pub mod fingerprint;
    pub mod session;
    pub mod user;
}

pub mod repositories {
    pub mod memory_session;
    pub mod session;
    pub mod user;
}

pub mod services {
    pub mod auth;
    pub mod session;
}

pub mod handlers {
    pub mod admin;
    pub mod auth;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod auth;
}
