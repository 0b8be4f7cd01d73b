use std::{sync::Arc, time::Duration};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;
use crate::{
    api::handler::AppState, config::Config, error::AppResult, ledger::LedgerRepository,
    middleware::RateLimitLayer,
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    // Database pool
    let pool = initialize_database(config).await?;

    // Core components
    let ledger = Arc::new(LedgerRepository::new(pool));
    let rate_limit = RateLimitLayer::new(config.rate_limit_requests, config.rate_limit_period_secs);
    info!(
        "✅ Rate limiter: {} requests per {}s",
        config.rate_limit_requests, config.rate_limit_period_secs
    );

    let state = AppState::new(ledger, rate_limit);

    info!("✓ Application state initialized");
    Ok(state)
}

async fn initialize_database(config: &Config) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await?;

    info!("✓ Database pool configured: {} max connections", config.db_max_connections);

    // Run migrations
    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
