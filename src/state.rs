use std::sync::Arc;

use anyhow::Context;
use redis::aio::ConnectionManager;

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, StoreBackend};
use crate::crypto::signer::Signer;
use crate::models::fingerprint::FingerprintPolicy;
use crate::repositories::memory_session::MemorySessionStore;
use crate::repositories::session::{RedisSessionStore, SessionStore};
use crate::repositories::user::{PgUserDirectory, UserDirectory};
use crate::services::session::SessionManager;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// Issues, validates and revokes sessions.
    pub sessions: SessionManager,
    /// The user directory consulted at login and on validation.
    pub users: Arc<dyn UserDirectory>,
    /// How client fingerprints are derived from requests.
    pub fingerprint: FingerprintPolicy,
    /// Set when sessions live in process memory; needs periodic purging.
    pub memory_store: Option<MemorySessionStore>,
}

impl AppState {
    /// Creates a new `AppState` from configuration, connecting to the backing services.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let mut signer = Signer::new(&config.secret_key, config.signature_salt.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid SECRET_KEY: {}", e))?;
        if let Some(previous) = &config.previous_secret_key {
            signer = signer
                .with_previous_key(previous)
                .map_err(|e| anyhow::anyhow!("Invalid SECRET_KEY_PREVIOUS: {}", e))?;
            tracing::info!("🔑 Previous signing key accepted for verification");
        }

        let pool = crate::db::create_pool(&config.database_url, config.database_pool_size)?;
        let users: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(pool));
        tracing::info!("✅ PostgreSQL user directory initialized");

        let (store, memory_store): (Arc<dyn SessionStore>, Option<MemorySessionStore>) =
            match config.store_backend {
                StoreBackend::Redis => {
                    let redis_client = redis::Client::open(config.redis_url.as_str())?;
                    let redis = ConnectionManager::new(redis_client)
                        .await
                        .context("Failed to connect to Redis")?;
                    tracing::info!("✅ Redis session store initialized");
                    (
                        Arc::new(RedisSessionStore::new(redis, config.session_key_prefix.clone())),
                        None,
                    )
                }
                StoreBackend::Memory => {
                    let store = MemorySessionStore::new(clock.clone());
                    tracing::warn!("⚠️  In-memory session store: sessions are lost on restart");
                    (Arc::new(store.clone()), Some(store))
                }
            };

        let sessions = SessionManager::new(signer, store, users.clone(), clock, config.session);

        Ok(Self {
            sessions,
            users,
            fingerprint: config.fingerprint.clone(),
            memory_store,
        })
    }

    /// Builds state around already constructed collaborators.
    pub fn from_parts(
        sessions: SessionManager,
        users: Arc<dyn UserDirectory>,
        fingerprint: FingerprintPolicy,
    ) -> Self {
        Self {
            sessions,
            users,
            fingerprint,
            memory_store: None,
        }
    }
}
