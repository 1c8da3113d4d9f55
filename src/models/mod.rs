mod url_mapping;

pub use url_mapping::{ShortUrlMetadataResponse, ShortenUrlRequest, ShortenUrlResponse, UrlMapping};
