use std::sync::Arc;

use log::info;

mod allocator;
mod shortener;

pub use shortener::{ShortenerService, ShortenerServiceTrait};

use crate::{
    config::ShortenerConfig,
    db::Database,
    repositories::UrlMappingRepository,
    utils::id_generator::RandomCodeGenerator,
};

/// The service wired against PostgreSQL
pub type ShortenerServiceType = ShortenerService<UrlMappingRepository, RandomCodeGenerator>;

/// Builds the production service graph
pub fn build(db: &Database, config: &ShortenerConfig) -> ShortenerServiceType {
    let repository = Arc::new(UrlMappingRepository::new(db));
    let generator = RandomCodeGenerator::new(config.code_length);
    info!(
        "Allocating {}-character short codes, {} attempts max, expiring after {} days",
        generator.length(),
        config.max_attempts,
        config.ttl_days
    );
    ShortenerService::new(repository, generator, config)
}

