//! # Medicare Mastery API Server
//!
//! Receives Stripe payment webhooks and serves account state to signed-in
//! users.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p mastery-api
//! ```

use mastery_api::{
    app::{build_router, AppState},
    config::Config,
};
use mastery_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, PoolSettings},
    },
    store::PgStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mastery_api=debug,mastery_shared=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Medicare Mastery API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(
        &PoolSettings::new(config.database.url.clone())
            .with_max_connections(config.database.max_connections),
    )
    .await?;

    run_migrations(&pool).await?;

    let bind_address = config.bind_address();
    let state = AppState::new(Arc::new(PgStore::new(pool.clone())), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received, closing database pool...");
    close_pool(pool).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
