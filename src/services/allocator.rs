// src/services/allocator.rs - Short code allocation
use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{debug, info, warn};

use crate::config::ShortenerConfig;
use crate::errors::ServiceError;
use crate::models::UrlMapping;
use crate::repositories::UrlMappingRepositoryTrait;
use crate::utils::id_generator::CodeGenerator;

type Result<T> = std::result::Result<T, ServiceError>;

/// Turns a long URL into a persisted mapping with a code no live mapping holds.
///
/// A candidate is first looked up in the store; a hit is a collision and a
/// new candidate is drawn. The lookup can race with another writer, so the
/// store's unique constraint has the final say: a `Conflict` from `save` is
/// handled exactly like a collision. Any other store failure ends the
/// allocation.
pub struct ShortCodeAllocator<R, G> {
    repository: Arc<R>,
    generator: G,
    ttl: Duration,
    max_attempts: usize,
}

impl<R, G> ShortCodeAllocator<R, G>
where
    R: UrlMappingRepositoryTrait,
    G: CodeGenerator,
{
    pub fn new(repository: Arc<R>, generator: G, config: &ShortenerConfig) -> Self {
        Self {
            repository,
            generator,
            ttl: config.ttl(),
            max_attempts: config.max_attempts,
        }
    }

    pub async fn allocate(&self, long_url: &str) -> Result<UrlMapping> {
        for attempt in 1..=self.max_attempts {
            let code = self.generator.generate();
            let now = Utc::now();

            if self.repository.find_by_code(&code, now).await?.is_some() {
                debug!("Short code '{}' is in use (attempt {})", code, attempt);
                continue;
            }

            let mapping = UrlMapping::new(code, long_url.to_string(), now, self.ttl);
            match self.repository.save(&mapping).await {
                Ok(saved) => {
                    info!("Allocated short code '{}' for {}", saved.code, saved.long_url);
                    return Ok(saved);
                }
                Err(e) if e.is_conflict() => {
                    debug!(
                        "Short code '{}' was taken concurrently (attempt {})",
                        mapping.code, attempt
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(
            "Giving up on {} after {} short code collisions",
            long_url, self.max_attempts
        );
        Err(ServiceError::AllocationExhausted {
            attempts: self.max_attempts,
        })
    }
}
