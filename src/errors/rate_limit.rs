use thiserror::Error;

/// Caller errors raised at the admission-control boundary.
///
/// These are never coerced into a valid limit; the caller has to fix its input.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("Bucket capacity must be greater than zero")]
    InvalidCapacity,

    #[error("Bucket refill period must be greater than zero")]
    InvalidRefillPeriod,

    #[error("Token amount must be greater than zero")]
    InvalidAmount,
}
