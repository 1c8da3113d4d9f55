// src/models/url_mapping.rs - Pure data structures
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::validations::validate_long_url;

// DTO for creating a new short URL
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShortenUrlRequest {
    #[validate(custom(function = "validate_long_url"))]
    pub long_url: String,
}

/// A short code and the long URL it redirects to
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct UrlMapping {
    pub id: Uuid,

    /// The short code, unique among live mappings
    pub code: String,

    /// The redirect target
    pub long_url: String,

    /// Number of metadata reads and redirects served
    pub hit_count: i64,

    pub created_at: DateTime<Utc>,

    /// The mapping is dead from this instant on
    pub expires_at: DateTime<Utc>,
}

impl UrlMapping {
    /// Builds a fresh mapping that lives for `ttl` from `now`
    pub fn new(code: String, long_url: String, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            long_url,
            hit_count: 0,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Live means `expires_at >= now`, the same filter the store applies
    #[cfg(test)]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at >= now
    }

    /// Location header value for a redirect. Targets without a scheme are sent to http.
    pub fn redirect_target(&self) -> String {
        if self.long_url.starts_with("http") {
            self.long_url.clone()
        } else {
            format!("http://{}", self.long_url)
        }
    }

    pub fn short_url(&self, base_url: &str) -> String {
        format!("{}r/{}", base_url, self.code)
    }
}

// DTO returned by the create endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenUrlResponse {
    pub code: String,
    pub short_url: String,
}

impl ShortenUrlResponse {
    pub fn new(mapping: &UrlMapping, base_url: &str) -> Self {
        Self {
            code: mapping.code.clone(),
            short_url: mapping.short_url(base_url),
        }
    }
}

// DTO returned by the metadata endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ShortUrlMetadataResponse {
    pub code: String,
    pub short_url: String,
    pub long_url: String,
    pub created_at: DateTime<Utc>,
    pub hit_count: i64,
}

impl ShortUrlMetadataResponse {
    pub fn new(mapping: UrlMapping, base_url: &str) -> Self {
        Self {
            short_url: mapping.short_url(base_url),
            code: mapping.code,
            long_url: mapping.long_url,
            created_at: mapping.created_at,
            hit_count: mapping.hit_count,
        }
    }
}
