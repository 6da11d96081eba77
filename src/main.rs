use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use tally::analytics::AnalyticsService;
use tally::api;
use tally::config::{Config, DatabaseBackend};
use tally::storage::{PostgresStorage, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.database.url);
            Arc::new(
                SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
            )
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", config.database.url);
            Arc::new(
                PostgresStorage::new(&config.database.url, config.database.max_connections)
                    .await?,
            )
        }
    };

    // Initialize database
    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    if config.analytics.report_cache_ttl_secs > 0 {
        info!(
            "📊 Report memoization enabled (ttl: {}s, max entries: {})",
            config.analytics.report_cache_ttl_secs, config.analytics.report_cache_max_entries
        );
    } else {
        info!("📊 Reports are recomputed on every request");
    }

    let analytics = AnalyticsService::new(Arc::clone(&storage), config.analytics.clone());
    let api_router = api::create_api_router(Arc::clone(&storage), analytics);

    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 API server listening on http://{}", api_addr);
    info!("   - Shared analytics at http://{}/api/analytics/shared", api_addr);
    info!("   - Sponsor analytics at http://{}/api/analytics/sponsor", api_addr);

    axum::serve(api_listener, api_router).await?;

    Ok(())
}
