//! # Taskboard API Server
//!
//! REST backend for shared task boards: accounts with cookie sessions,
//! tasks with comments, boards with invitations, and an in-app
//! notification inbox.
//!
//! ## Startup
//!
//! 1. Load configuration from the environment (and `.env`)
//! 2. Connect to PostgreSQL and apply migrations
//! 3. Start the expired-invitation sweeper
//! 4. Serve until Ctrl+C, then drain and close the pool
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskboard-api
//! ```

use std::time::Duration;
use taskboard_api::{
    app::{build_router, image_store, AppState},
    config::Config,
};
use taskboard_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    models::invitation::BoardInvitation,
};
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "taskboard_api=debug,taskboard_shared=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Taskboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let db = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&db).await?;

    spawn_invitation_sweeper(
        db.clone(),
        Duration::from_secs(config.invitation_sweep_secs),
    );

    let addr = config.bind_address();
    let images = image_store(&config);
    let app = build_router(AppState::new(db.clone(), config, images));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, closing database pool");
    close_pool(db).await;

    Ok(())
}

/// Periodically removes invitations past their expiry
fn spawn_invitation_sweeper(db: PgPool, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match BoardInvitation::purge_expired(&db).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Expired invitations removed"),
                Err(e) => tracing::warn!(error = %e, "Invitation sweep failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
