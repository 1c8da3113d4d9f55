// src/repositories/url_mapping.rs - Data access
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::Database;
use crate::errors::RepositoryError;
use crate::models::UrlMapping;

type Result<T> = std::result::Result<T, RepositoryError>;

const COLUMNS: &str = "id, code, long_url, hit_count, created_at, expires_at";

/// The mapping store consumed by the shortener.
///
/// Lookups only ever return live rows, i.e. rows with `expires_at >= now`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlMappingRepositoryTrait: Send + Sync {
    /// Finds the live mapping holding `code`
    ///
    /// ### Errors
    /// * `RepositoryError::Database` - If a database error occurs
    async fn find_by_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<UrlMapping>>;

    /// Finds the newest live mapping pointing at `long_url`
    ///
    /// ### Errors
    /// * `RepositoryError::Database` - If a database error occurs
    async fn find_by_long_url(
        &self,
        long_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UrlMapping>>;

    /// Inserts a new mapping and returns the stored row
    ///
    /// ### Errors
    /// * `RepositoryError::Conflict` - If the code is already taken (unique constraint)
    /// * `RepositoryError::Database` - If a database error occurs
    async fn save(&self, mapping: &UrlMapping) -> Result<UrlMapping>;

    /// Atomically adds one to the hit count and returns the new value
    ///
    /// ### Errors
    /// * `RepositoryError::NotFound` - If no row has this id
    /// * `RepositoryError::Database` - If a database error occurs
    async fn increment_hit_count(&self, id: &Uuid) -> Result<i64>;
}

// Implementation using actual database
pub struct UrlMappingRepository {
    pool: PgPool,
}

impl UrlMappingRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.get_pool().clone(),
        }
    }

    // Helper method for transactions
    async fn begin_transaction(&self) -> Result<Transaction<'_, Postgres>> {
        self.pool.begin().await.map_err(|e| {
            log::error!("Failed to start database transaction: {}", e);
            RepositoryError::Database(e)
        })
    }
}

#[async_trait]
impl UrlMappingRepositoryTrait for UrlMappingRepository {
    async fn find_by_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<UrlMapping>> {
        let query = format!(
            "SELECT {} FROM url_mappings WHERE code = $1 AND expires_at >= $2",
            COLUMNS
        );

        sqlx::query_as::<_, UrlMapping>(&query)
            .bind(code)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::Database)
    }

    async fn find_by_long_url(
        &self,
        long_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UrlMapping>> {
        let query = format!(
            "SELECT {} FROM url_mappings \
             WHERE long_url = $1 AND expires_at >= $2 \
             ORDER BY created_at DESC LIMIT 1",
            COLUMNS
        );

        sqlx::query_as::<_, UrlMapping>(&query)
            .bind(long_url)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::Database)
    }

    async fn save(&self, mapping: &UrlMapping) -> Result<UrlMapping> {
        // Start a transaction so we can rollback if needed
        let mut tx = self.begin_transaction().await?;

        let query = format!(
            "INSERT INTO url_mappings ({cols}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {cols}",
            cols = COLUMNS
        );

        let record = sqlx::query_as::<_, UrlMapping>(&query)
            .bind(mapping.id)
            .bind(&mapping.code)
            .bind(&mapping.long_url)
            .bind(mapping.hit_count)
            .bind(mapping.created_at)
            .bind(mapping.expires_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                let err = RepositoryError::from(e);
                if err.is_conflict() {
                    debug!("Short code '{}' already taken: {}", mapping.code, err);
                } else {
                    log::error!("Failed to insert URL mapping: {}", err);
                }
                err
            })?;

        // Commit the transaction
        tx.commit().await.map_err(|e| {
            log::error!("Failed to commit transaction: {}", e);
            RepositoryError::from(e)
        })?;

        Ok(record)
    }

    async fn increment_hit_count(&self, id: &Uuid) -> Result<i64> {
        let hit_count: Option<i64> = sqlx::query_scalar(
            "UPDATE url_mappings SET hit_count = hit_count + 1 WHERE id = $1 RETURNING hit_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::Database)?;

        hit_count.ok_or_else(|| RepositoryError::NotFound(format!("URL mapping with ID {} not found", id)))
    }
}
