use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use churchdonate_api::app::{self, AuthStores};
use churchdonate_api::config::Config;
use churchdonate_api::jobs::{CleanupAuthJob, JobScheduler, PoolMetricsJob};
use churchdonate_api::middleware::logging::init_logging;
use churchdonate_api::middleware::metrics::init_metrics;
use churchdonate_api::services::otp::OtpStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting ChurchDonate API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    init_metrics();

    // Create database pool
    let db_config = persistence::db::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        connect_timeout_secs: config.database.connect_timeout_secs,
        idle_timeout_secs: config.database.idle_timeout_secs,
    };
    let pool = persistence::db::create_pool(&db_config).await?;

    // Run migrations
    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    // In-memory login state, shared with the cleanup job
    let stores = AuthStores::new();

    // Background jobs
    let mut scheduler = JobScheduler::new();
    scheduler.register(CleanupAuthJob::new(
        vec![
            stores.operator_otp.clone() as Arc<dyn OtpStore>,
            stores.manager_otp.clone(),
        ],
        stores.rate_limits.clone(),
    ));
    scheduler.register(PoolMetricsJob::new(
        pool.clone(),
        config.database.pool_metrics_interval_secs,
    ));
    scheduler.start();

    // Build application
    let app = app::create_app(config.clone(), pool, &stores);

    // Start server
    let addr = config.socket_addr()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop background jobs once the server loop has exited
    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
