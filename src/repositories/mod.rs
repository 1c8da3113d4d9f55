mod url_mapping;

#[cfg(test)]
mod memory;

#[cfg(test)]
pub use memory::InMemoryUrlMappingRepository;
#[cfg(test)]
pub use url_mapping::MockUrlMappingRepositoryTrait;
pub use url_mapping::{UrlMappingRepository, UrlMappingRepositoryTrait};
