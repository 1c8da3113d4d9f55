use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;
use sqlx::{
    migrate::{MigrateDatabase, MigrateError},
    postgres::{PgPool, PgPoolOptions},
    FromRow, Postgres,
};
use thiserror::Error;
use url::Url;

use crate::config::DatabaseConfig;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] MigrateError),

    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    #[error("Database '{0}' does not exist")]
    Missing(String),

    #[error("Failed to create database '{name}': {source}")]
    Creation {
        name: String,
        #[source]
        source: sqlx::Error,
    },
}

pub type DbResult<T> = Result<T, DatabaseError>;

/// Shared PostgreSQL pool backing the mapping store
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DBHealthStatus {
    Healthy,
    Unhealthy,
}

/// What the health endpoint learns from one round trip
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoreSnapshot {
    pub database: String,
    pub server_version: String,
    pub live_mappings: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseHealth {
    pub status: DBHealthStatus,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreSnapshot>,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        debug!(
            "Connecting to database: max_conn={}, min_conn={}, timeout={}s",
            config.max_connections, config.min_connections, config.connect_timeout_seconds
        );

        if !config.skip_db_exists_check {
            ensure_database_exists(config).await?;
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(&config.url)
            .await
            .inspect_err(|e| warn!("Failed to connect to database: {}", e))?;

        if config.use_migrations {
            info!("Applying url_mappings migrations");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .inspect_err(|e| warn!("Migration failed: {}", e))?;
        }

        info!("Database ready");
        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Probes the store and counts live mappings in the same query.
    ///
    /// A failed probe is reported as `Unhealthy` rather than an error so the
    /// health endpoint can still answer.
    pub async fn health_check(&self) -> DbResult<DatabaseHealth> {
        let start = Instant::now();

        let result = sqlx::query_as::<_, StoreSnapshot>(
            "SELECT current_database() AS database, \
                    version() AS server_version, \
                    (SELECT COUNT(*) FROM url_mappings WHERE expires_at >= NOW()) AS live_mappings",
        )
        .fetch_one(&self.pool)
        .await;

        let response_time_ms = start.elapsed().as_millis() as u64;

        Ok(match result {
            Ok(store) => DatabaseHealth {
                status: DBHealthStatus::Healthy,
                response_time_ms,
                message: None,
                store: Some(store),
            },
            Err(e) => DatabaseHealth {
                status: DBHealthStatus::Unhealthy,
                response_time_ms,
                message: Some(format!("Database query failed: {}", e)),
                store: None,
            },
        })
    }

    pub async fn shutdown(&self) {
        let open = self.pool.size();
        let idle = self.pool.num_idle();

        self.pool.close().await;

        info!(
            "Database pool closed ({} open, {} idle connections released)",
            open, idle
        );
    }
}

async fn ensure_database_exists(config: &DatabaseConfig) -> DbResult<()> {
    let name = database_name(&config.url)?;

    if Postgres::database_exists(&config.url).await? {
        debug!("Database '{}' exists", name);
        return Ok(());
    }

    if !config.create_database_if_missing {
        return Err(DatabaseError::Missing(name));
    }

    info!("Creating missing database '{}'", name);
    Postgres::create_database(&config.url)
        .await
        .map_err(|source| DatabaseError::Creation { name, source })
}

fn database_name(url: &str) -> DbResult<String> {
    let parsed = Url::parse(url).map_err(|e| DatabaseError::InvalidUrl(e.to_string()))?;
    let name = parsed.path().trim_start_matches('/');

    if name.is_empty() || name.contains('/') {
        return Err(DatabaseError::InvalidUrl(format!(
            "no database name in '{}'",
            parsed.path()
        )));
    }

    Ok(name.to_string())
}
