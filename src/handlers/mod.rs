mod url_mapping;

pub use url_mapping::{create_handler, metadata_handler, redirect_handler};
