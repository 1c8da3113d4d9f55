mod url_mapping;

pub use url_mapping::{validate_long_url, validate_short_code, MAX_CODE_LENGTH};
