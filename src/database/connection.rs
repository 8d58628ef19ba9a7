//! PostgreSQL pool setup and migrations

use std::time::Duration;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::{debug, info};
use crate::config::DatabaseConfig;
use crate::utils::errors::KinoBotError;

pub type DatabasePool = Pool<Postgres>;

const IDLE_TIMEOUT: Duration = Duration::from_secs(600);
const MAX_LIFETIME: Duration = Duration::from_secs(1800);

/// Pool sizing derived from the `[database]` section
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections.min(config.max_connections),
            acquire_timeout: Duration::from_secs(config.acquire_timeout_seconds),
        }
    }
}

impl PoolConfig {
    /// Host and database name only, safe to log
    pub fn redacted_target(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(url) => format!("{}{}", url.host_str().unwrap_or("localhost"), url.path()),
            Err(_) => "<unparseable url>".to_string(),
        }
    }
}

/// Connect and verify the pool answers queries
pub async fn create_pool(config: &PoolConfig) -> Result<DatabasePool, KinoBotError> {
    debug!(
        target_db = %config.redacted_target(),
        max_connections = config.max_connections,
        "Connecting to PostgreSQL"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(IDLE_TIMEOUT)
        .max_lifetime(MAX_LIFETIME)
        .connect(&config.url)
        .await?;

    health_check(&pool).await?;
    info!(target_db = %config.redacted_target(), "Database pool ready");
    Ok(pool)
}

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), KinoBotError> {
    let migrator = sqlx::migrate!("./migrations");
    migrator.run(pool).await?;

    info!(known_migrations = migrator.iter().count(), "Schema is up to date");
    Ok(())
}

pub async fn health_check(pool: &DatabasePool) -> Result<(), KinoBotError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
