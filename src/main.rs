use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use session_gate::{config::Config, routes, state::AppState};

/// How often the in-memory store drops expired sessions.
const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!(
        "✅ Configuration loaded - sliding TTL: {}s, max lifetime: {}s",
        config.session.sliding_ttl.num_seconds(),
        config.session.max_lifetime.num_seconds()
    );

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    if let Some(store) = state.memory_store.clone() {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(PURGE_INTERVAL).await;
                let purged = store.purge_expired().await;
                tracing::info!("🧹 Purged {} expired sessions", purged);
            }
        });
        tracing::info!("✅ Background session purge started (runs every hour)");
    }

    let app = routes::app(state);

    let addr = config.bind_addr;
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
