use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::UrlMappingRepositoryTrait;
use crate::errors::RepositoryError;
use crate::models::UrlMapping;

type Result<T> = std::result::Result<T, RepositoryError>;

/// Mapping store held in memory with the same constraints as the SQL schema:
/// `code` is unique across every row, live or expired.
#[derive(Debug, Default)]
pub struct InMemoryUrlMappingRepository {
    rows: Mutex<HashMap<Uuid, UrlMapping>>,
}

impl InMemoryUrlMappingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a row as-is, bypassing the uniqueness check. Used to seed fixtures.
    pub fn insert_unchecked(&self, mapping: UrlMapping) {
        self.rows.lock().insert(mapping.id, mapping);
    }

    pub fn all(&self) -> Vec<UrlMapping> {
        self.rows.lock().values().cloned().collect()
    }
}

#[async_trait]
impl UrlMappingRepositoryTrait for InMemoryUrlMappingRepository {
    async fn find_by_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<UrlMapping>> {
        Ok(self
            .rows
            .lock()
            .values()
            .find(|m| m.code == code && m.is_live_at(now))
            .cloned())
    }

    async fn find_by_long_url(
        &self,
        long_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UrlMapping>> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|m| m.long_url == long_url && m.is_live_at(now))
            .max_by_key(|m| m.created_at)
            .cloned())
    }

    async fn save(&self, mapping: &UrlMapping) -> Result<UrlMapping> {
        let mut rows = self.rows.lock();
        if rows.values().any(|m| m.code == mapping.code) {
            return Err(RepositoryError::Conflict(format!(
                "Short code '{}' already exists",
                mapping.code
            )));
        }
        if rows.contains_key(&mapping.id) {
            return Err(RepositoryError::Conflict(format!(
                "URL mapping with ID {} already exists",
                mapping.id
            )));
        }
        rows.insert(mapping.id, mapping.clone());
        Ok(mapping.clone())
    }

    async fn increment_hit_count(&self, id: &Uuid) -> Result<i64> {
        let mut rows = self.rows.lock();
        let mapping = rows
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("URL mapping with ID {} not found", id)))?;
        mapping.hit_count += 1;
        Ok(mapping.hit_count)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn mapping(code: &str, long_url: &str, created_at: DateTime<Utc>) -> UrlMapping {
        UrlMapping::new(code.into(), long_url.into(), created_at, Duration::days(7))
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts_even_when_expired() {
        let repo = InMemoryUrlMappingRepository::new();
        let old = Utc::now() - Duration::days(30);
        repo.insert_unchecked(mapping("abc123", "https://old.example", old));

        assert!(repo.find_by_code("abc123", Utc::now()).await.unwrap().is_none());

        let err = repo
            .save(&mapping("abc123", "https://new.example", Utc::now()))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_find_by_long_url_prefers_newest_live_row() {
        let repo = InMemoryUrlMappingRepository::new();
        let now = Utc::now();
        repo.save(&mapping("aaaaaa", "https://example.com", now - Duration::days(2)))
            .await
            .unwrap();
        repo.save(&mapping("bbbbbb", "https://example.com", now - Duration::days(1)))
            .await
            .unwrap();

        let found = repo.find_by_long_url("https://example.com", now).await.unwrap();
        assert_eq!(found.unwrap().code, "bbbbbb");
    }

    #[tokio::test]
    async fn test_increment_hit_count() {
        let repo = InMemoryUrlMappingRepository::new();
        let saved = repo
            .save(&mapping("abc123", "https://example.com", Utc::now()))
            .await
            .unwrap();

        assert_eq!(repo.increment_hit_count(&saved.id).await.unwrap(), 1);
        assert_eq!(repo.increment_hit_count(&saved.id).await.unwrap(), 2);
        assert!(matches!(
            repo.increment_hit_count(&Uuid::new_v4()).await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
