use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::clock::{Clock, SystemClock};
use crate::errors::RateLimitError;

/// Validated token bucket parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketLimit {
    capacity: u64,
    refill_period: Duration,
}

impl BucketLimit {
    pub fn new(capacity: u64, refill_period: Duration) -> Result<Self, RateLimitError> {
        if capacity == 0 {
            return Err(RateLimitError::InvalidCapacity);
        }
        if refill_period.is_zero() {
            return Err(RateLimitError::InvalidRefillPeriod);
        }
        Ok(Self {
            capacity,
            refill_period,
        })
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn refill_period(&self) -> Duration {
        self.refill_period
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: u64,
    last_refill: Instant,
}

/// A fixed-capacity token bucket with greedy refill.
///
/// Once `refill_period` has elapsed since the last refill the bucket is topped
/// back up to `capacity` in one step; tokens never trickle in. Refill and
/// consumption happen under a single per-bucket lock, so concurrent callers
/// sharing a bucket always observe `0 <= tokens <= capacity`.
#[derive(Debug)]
pub struct TokenBucket<C: Clock = SystemClock> {
    limit: BucketLimit,
    state: Mutex<BucketState>,
    clock: C,
}

impl TokenBucket {
    #[cfg(test)]
    pub fn new(limit: BucketLimit) -> Self {
        Self::with_clock(limit, SystemClock)
    }
}

impl<C: Clock> TokenBucket<C> {
    /// Creates a full bucket whose refill period starts now.
    pub fn with_clock(limit: BucketLimit, clock: C) -> Self {
        let last_refill = clock.now();
        Self {
            limit,
            state: Mutex::new(BucketState {
                tokens: limit.capacity,
                last_refill,
            }),
            clock,
        }
    }

    /// Attempts to take `amount` tokens.
    ///
    /// Returns `Ok(true)` when the tokens were deducted and `Ok(false)` when
    /// the bucket holds fewer than `amount`; a rejected call leaves the
    /// bucket untouched. An `amount` of zero is a caller error.
    pub fn try_consume(&self, amount: u64) -> Result<bool, RateLimitError> {
        if amount == 0 {
            return Err(RateLimitError::InvalidAmount);
        }

        let now = self.clock.now();
        let mut state = self.state.lock();
        self.refill(&mut state, now);

        if state.tokens >= amount {
            state.tokens -= amount;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Tokens available right now, after applying any due refill.
    pub fn available_tokens(&self) -> u64 {
        let now = self.clock.now();
        let mut state = self.state.lock();
        self.refill(&mut state, now);
        state.tokens
    }

    pub fn capacity(&self) -> u64 {
        self.limit.capacity
    }

    pub fn refill_period(&self) -> Duration {
        self.limit.refill_period
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        // `now` is read before the lock, so another caller may already have refilled later
        if now.saturating_duration_since(state.last_refill) >= self.limit.refill_period {
            state.tokens = self.limit.capacity;
            state.last_refill = now;
        }
    }
}
