//! In-memory admission control: per-key token buckets with greedy refill.

mod bucket;
mod clock;
mod registry;

pub use bucket::BucketLimit;
#[cfg(test)]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use registry::BucketRegistry;
