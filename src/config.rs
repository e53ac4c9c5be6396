use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use chrono::{TimeDelta, Utc};
use zeroize::{Zeroize, Zeroizing};

use crate::models::fingerprint::{FingerprintField, FingerprintPolicy};
use crate::services::session::{RolePolicy, SessionPolicy};

/// Minimum accepted length of a signing key, in bytes.
pub const MIN_SECRET_KEY_BYTES: usize = 32;

/// Upper bound for both session durations.
pub const MAX_SESSION_SECS: i64 = 365 * 24 * 60 * 60;

/// Which backend holds session records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database holding users.
    pub database_url: String,
    /// The maximum number of pooled database connections.
    pub database_pool_size: usize,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// Where session records live.
    pub store_backend: StoreBackend,
    /// Prefix prepended to every session key in Redis.
    pub session_key_prefix: String,
    /// The key used to sign session identifiers.
    pub secret_key: Zeroizing<Vec<u8>>,
    /// A retired key still accepted for verification during rotation.
    pub previous_secret_key: Option<Zeroizing<Vec<u8>>>,
    /// Domain separation salt mixed into every signature.
    pub signature_salt: String,
    /// Sliding window, absolute cap and role policy.
    pub session: SessionPolicy,
    /// Request fields that make up the client fingerprint.
    pub fingerprint: FingerprintPolicy,
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Creates a new `Config` from an arbitrary key lookup.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the raw value of a configuration key, if set.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = decode_secret(
            lookup("SECRET_KEY")
                .context("SECRET_KEY must be set (generate with: openssl rand -hex 32)")?,
            "SECRET_KEY",
        )?;

        let previous_secret_key = lookup("SECRET_KEY_PREVIOUS")
            .filter(|v| !v.trim().is_empty())
            .map(|v| decode_secret(v, "SECRET_KEY_PREVIOUS"))
            .transpose()?;

        let sliding_ttl = parse_duration(&lookup, "SESSION_SLIDING_TTL_SECS", 3600)?;
        let max_lifetime = parse_duration(&lookup, "SESSION_MAX_LIFETIME_SECS", 86400)?;

        if sliding_ttl > max_lifetime {
            anyhow::bail!("SESSION_SLIDING_TTL_SECS must not exceed SESSION_MAX_LIFETIME_SECS");
        }
        Utc::now()
            .checked_add_signed(max_lifetime)
            .context("SESSION_MAX_LIFETIME_SECS overflows the session deadline")?;

        let role_policy = match lookup("SESSION_ROLE_POLICY").as_deref() {
            None | Some("issue") => RolePolicy::CapturedAtIssue,
            Some("validation") => RolePolicy::ResolvedAtValidation,
            Some(other) => anyhow::bail!(
                "Invalid SESSION_ROLE_POLICY '{}' (expected 'issue' or 'validation')",
                other
            ),
        };

        let fields = lookup("FINGERPRINT_FIELDS")
            .unwrap_or_else(|| "user-agent".to_string())
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| {
                f.parse::<FingerprintField>()
                    .map_err(|_| anyhow::anyhow!("Unknown FINGERPRINT_FIELDS entry '{}'", f))
            })
            .collect::<Result<Vec<_>>>()?;

        if fields.is_empty() {
            anyhow::bail!("FINGERPRINT_FIELDS must name at least one field");
        }

        let trust_forwarded_for = lookup("TRUST_FORWARDED_FOR")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let store_backend = match lookup("SESSION_STORE").as_deref() {
            None | Some("redis") => StoreBackend::Redis,
            Some("memory") => StoreBackend::Memory,
            Some(other) => anyhow::bail!(
                "Invalid SESSION_STORE '{}' (expected 'redis' or 'memory')",
                other
            ),
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_pool_size: lookup("DATABASE_POOL_SIZE")
                .unwrap_or_else(|| "16".to_string())
                .parse()
                .context("Invalid DATABASE_POOL_SIZE")?,
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            store_backend,
            session_key_prefix: lookup("SESSION_KEY_PREFIX")
                .unwrap_or_else(|| "auth:sessions:".to_string()),
            secret_key,
            previous_secret_key,
            signature_salt: lookup("SIGNATURE_SALT")
                .unwrap_or_else(|| "session-id".to_string()),
            session: SessionPolicy {
                sliding_ttl,
                max_lifetime,
                role_policy,
            },
            fingerprint: FingerprintPolicy {
                fields,
                trust_forwarded_for,
            },
            bind_addr: lookup("BIND_ADDR")
                .unwrap_or_else(|| "127.0.0.1:3000".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
        })
    }
}

/// Reads a positive number of seconds, at most `MAX_SESSION_SECS`.
fn parse_duration<F>(lookup: &F, name: &str, default: i64) -> Result<TimeDelta>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: i64 = match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", name))?,
        None => default,
    };

    if secs <= 0 || secs > MAX_SESSION_SECS {
        anyhow::bail!("{} must be between 1 and {} seconds", name, MAX_SESSION_SECS);
    }
    TimeDelta::try_seconds(secs).with_context(|| format!("{} is out of range", name))
}

fn decode_secret(mut hex_value: String, name: &str) -> Result<Zeroizing<Vec<u8>>> {
    let decoded = hex::decode(hex_value.trim());
    hex_value.zeroize();

    let bytes = Zeroizing::new(decoded.with_context(|| format!("{} must be valid hexadecimal", name))?);
    if bytes.len() < MIN_SECRET_KEY_BYTES {
        anyhow::bail!(
            "{} must be at least {} bytes ({} hex characters)",
            name,
            MIN_SECRET_KEY_BYTES,
            MIN_SECRET_KEY_BYTES * 2
        );
    }
    Ok(bytes)
}
