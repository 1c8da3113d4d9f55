// src/services/shortener.rs - Business logic
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use validator::Validate;

use super::allocator::ShortCodeAllocator;
use crate::config::ShortenerConfig;
use crate::errors::ServiceError;
use crate::models::{ShortUrlMetadataResponse, ShortenUrlRequest, ShortenUrlResponse, UrlMapping};
use crate::repositories::UrlMappingRepositoryTrait;
use crate::utils::id_generator::CodeGenerator;
use crate::validations::validate_short_code;

type Result<T> = std::result::Result<T, ServiceError>;

#[async_trait]
pub trait ShortenerServiceTrait: Send + Sync {
    /// Returns the live mapping for the URL if there is one, else allocates a new code
    async fn shorten(&self, request: ShortenUrlRequest) -> Result<ShortenUrlResponse>;

    /// Metadata as it was before this read; the read itself counts as a hit
    async fn metadata(&self, code: &str) -> Result<ShortUrlMetadataResponse>;

    /// Counts a hit and returns the Location to redirect to
    async fn resolve_redirect(&self, code: &str) -> Result<String>;
}

pub struct ShortenerService<R, G> {
    repository: Arc<R>,
    allocator: ShortCodeAllocator<R, G>,
    base_url: String,
}

impl<R, G> ShortenerService<R, G>
where
    R: UrlMappingRepositoryTrait,
    G: CodeGenerator,
{
    pub fn new(repository: Arc<R>, generator: G, config: &ShortenerConfig) -> Self {
        Self {
            allocator: ShortCodeAllocator::new(repository.clone(), generator, config),
            repository,
            base_url: config.base_url.clone(),
        }
    }

    async fn find_live(&self, code: &str) -> Result<UrlMapping> {
        let not_found = || ServiceError::NotFound(format!("No live URL for code '{}'", code));

        if validate_short_code(code).is_err() {
            return Err(not_found());
        }

        self.repository
            .find_by_code(code, Utc::now())
            .await?
            .ok_or_else(not_found)
    }

    /// Hit counting never fails the request that triggered it
    async fn record_hit(&self, mapping: &UrlMapping) {
        if let Err(e) = self.repository.increment_hit_count(&mapping.id).await {
            warn!("Failed to record hit for code '{}': {}", mapping.code, e);
        }
    }
}

#[async_trait]
impl<R, G> ShortenerServiceTrait for ShortenerService<R, G>
where
    R: UrlMappingRepositoryTrait,
    G: CodeGenerator,
{
    async fn shorten(&self, request: ShortenUrlRequest) -> Result<ShortenUrlResponse> {
        request.validate()?;
        let long_url = request.long_url.trim();

        if let Some(existing) = self
            .repository
            .find_by_long_url(long_url, Utc::now())
            .await?
        {
            debug!("Reusing live code '{}' for {}", existing.code, long_url);
            return Ok(ShortenUrlResponse::new(&existing, &self.base_url));
        }

        let mapping = self.allocator.allocate(long_url).await?;
        Ok(ShortenUrlResponse::new(&mapping, &self.base_url))
    }

    async fn metadata(&self, code: &str) -> Result<ShortUrlMetadataResponse> {
        let mapping = self.find_live(code).await?;
        self.record_hit(&mapping).await;
        Ok(ShortUrlMetadataResponse::new(mapping, &self.base_url))
    }

    async fn resolve_redirect(&self, code: &str) -> Result<String> {
        let mapping = self.find_live(code).await?;
        self.record_hit(&mapping).await;
        Ok(mapping.redirect_target())
    }
}
