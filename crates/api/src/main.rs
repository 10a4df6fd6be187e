use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use domain::services::{InMemoryStore, MockNotificationDispatcher};
use proximity_api::app::{create_app, AppState, Stores};
use proximity_api::config::{Config, StorageBackend};
use proximity_api::jobs::{JobScheduler, PoolMetricsJob, ResetDailyCountersJob};
use proximity_api::middleware;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics()?;

    info!("Starting proximity server v{}", env!("CARGO_PKG_VERSION"));

    let (stores, pool) = match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

            info!("Running database migrations...");
            sqlx::migrate!("../persistence/src/migrations")
                .run(&pool)
                .await?;
            info!("Migrations completed");

            (Stores::postgres(&pool), Some(pool))
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on restart");
            (Stores::memory(Arc::new(InMemoryStore::with_all_premium())), None)
        }
    };

    let mut scheduler = JobScheduler::new();
    if config.jobs.enabled {
        scheduler.register(ResetDailyCountersJob::new(stores.alerts.clone()));
        if let Some(pool) = &pool {
            scheduler.register(PoolMetricsJob::new(pool.clone()));
        }
        scheduler.start();
    }

    let addr = config.socket_addr()?;
    let state = AppState::new(
        config,
        stores,
        Arc::new(MockNotificationDispatcher::log_only()),
        pool,
    );
    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
