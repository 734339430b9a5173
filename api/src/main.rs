//! EventDesk API - Main Entry Point

use anyhow::Context;
use eventdesk_api::{build_router, config::ApiConfig, ApiState};
use eventdesk_core::{InMemoryStore, PgStore, VolunteerStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("EventDesk API v{}", env!("CARGO_PKG_VERSION"));

    let config = ApiConfig::load().context("loading configuration")?;
    if config.uses_dev_secret() {
        tracing::warn!("using the development JWT secret; set EVENTDESK__JWT_SECRET");
    }

    let store: Arc<dyn VolunteerStore> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.max_connections)
                .await
                .context("connecting to PostgreSQL")?;
            if config.run_migrations {
                store.migrate().await.context("running migrations")?;
            }
            tracing::info!(max_connections = config.max_connections, "using PostgreSQL store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("no database_url configured, data is kept in memory only");
            Arc::new(InMemoryStore::new())
        }
    };

    let state = ApiState::new(store, config.jwt_secret.clone());
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
