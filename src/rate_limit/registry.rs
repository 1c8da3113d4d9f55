use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use log::debug;

use super::bucket::{BucketLimit, TokenBucket};
use super::clock::{Clock, SystemClock};
use crate::errors::RateLimitError;

/// Concurrent key -> bucket table with create-if-absent semantics.
///
/// A bucket is created the first time its key is resolved and lives as long
/// as the registry. Its limit is pinned at creation: later calls for the same
/// key get the existing bucket back whatever limit they pass.
#[derive(Debug)]
pub struct BucketRegistry<C: Clock + Clone = SystemClock> {
    buckets: DashMap<String, Arc<TokenBucket<C>>>,
    clock: C,
}

impl BucketRegistry {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for BucketRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock + Clone> BucketRegistry<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            buckets: DashMap::new(),
            clock,
        }
    }

    /// Returns the bucket for `key`, creating it with `capacity` and
    /// `refill_period` if the key has not been seen before.
    ///
    /// The parameters are validated on every call, even when they end up
    /// being ignored because the bucket already exists.
    pub fn resolve(
        &self,
        key: &str,
        capacity: u64,
        refill_period: Duration,
    ) -> Result<Arc<TokenBucket<C>>, RateLimitError> {
        let limit = BucketLimit::new(capacity, refill_period)?;
        Ok(self.resolve_limit(key, limit))
    }

    fn resolve_limit(&self, key: &str, limit: BucketLimit) -> Arc<TokenBucket<C>> {
        if let Some(bucket) = self.buckets.get(key) {
            return Arc::clone(bucket.value());
        }

        // The entry API holds the shard lock across check and insert, so
        // racing first-time callers all end up with the winner's bucket.
        let bucket = self.buckets.entry(key.to_owned()).or_insert_with(|| {
            debug!(
                "Creating token bucket for key '{}' (capacity={}, refill_period={:?})",
                key,
                limit.capacity(),
                limit.refill_period()
            );
            Arc::new(TokenBucket::with_clock(limit, self.clock.clone()))
        });

        Arc::clone(bucket.value())
    }

    /// Number of keys with a bucket.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }
}
