use std::borrow::Cow;

use url::Url;
use validator::ValidationError;

use crate::utils::id_generator::ALPHABET;

/// Longest code the store can hold
pub const MAX_CODE_LENGTH: usize = 16;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Validates that a long URL is present, well formed and uses http/https
pub fn validate_long_url(url_str: &str) -> Result<(), ValidationError> {
    if url_str.trim().is_empty() {
        return Err(error("long_url_blank", "Long URL cannot be blank"));
    }

    match Url::parse(url_str.trim()) {
        Ok(url) => {
            // Ensure URL has a host
            if url.host().is_none() {
                return Err(error("long_url_host", "URL must have a host"));
            }

            // Only accept HTTP and HTTPS URLs
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(error("long_url_scheme", "URL scheme must be http or https"));
            }

            Ok(())
        }
        Err(_) => Err(error("long_url_format", "Invalid URL format")),
    }
}

/// Checks that a path segment could be a short code at all.
///
/// Anything else can be answered with 404 without touching the store.
pub fn validate_short_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty()
        || code.len() > MAX_CODE_LENGTH
        || !code.bytes().all(|b| ALPHABET.contains(&b))
    {
        return Err(error("short_code_format", "Malformed short code"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_long_url() {
        // Valid URLs
        assert!(validate_long_url("https://example.com").is_ok());
        assert!(validate_long_url("http://example.com/path?query=value").is_ok());

        // Invalid URLs
        assert!(validate_long_url("").is_err());
        assert!(validate_long_url("   ").is_err());
        assert!(validate_long_url("not-a-url").is_err());
        assert!(validate_long_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_blank_url_message() {
        let err = validate_long_url(" ").unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Long URL cannot be blank"));
    }

    #[test]
    fn test_validate_short_code() {
        assert!(validate_short_code("aZ09xY").is_ok());
        assert!(validate_short_code("").is_err());
        assert!(validate_short_code(&"a".repeat(17)).is_err());
        assert!(validate_short_code("aZ-9xY").is_err());
        assert!(validate_short_code("ñZ09x").is_err());
    }
}
