mod rate_limit;
mod request_logger;

pub use rate_limit::RateLimiter;
pub use request_logger::RequestLogger;
