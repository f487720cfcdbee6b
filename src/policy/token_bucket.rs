//! Token bucket used by the route and retry rate limiters.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Burst used when a negative burst is normalized.
pub const DEFAULT_BURST: i32 = 1;

/// Events per second admitted by a limiter.
///
/// [`Limit::UNLIMITED`] disables the bucket entirely.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Limit(f64);

impl Limit {
    pub const UNLIMITED: Limit = Limit(f64::INFINITY);

    pub fn new(per_second: f64) -> Self {
        Self(per_second)
    }

    pub fn per_second(self) -> f64 {
        self.0
    }

    pub fn is_unlimited(self) -> bool {
        self.0 == f64::INFINITY
    }

    pub(crate) fn is_negative(self) -> bool {
        self.0 < 0.0
    }
}

impl From<f64> for Limit {
    fn from(per_second: f64) -> Self {
        Self(per_second)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Map a negative limit to unlimited and a negative burst to [`DEFAULT_BURST`].
pub fn normalize(limit: Limit, burst: i32) -> (Limit, i32) {
    let limit = if limit.is_negative() { Limit::UNLIMITED } else { limit };
    let burst = if burst < 0 { DEFAULT_BURST } else { burst };
    (limit, burst)
}

struct BucketState {
    tokens: f64,
    last_update: Instant,
}

/// A token bucket that starts full and refills at `limit` tokens per second up to `burst`.
///
/// Decisions are computed arithmetically from elapsed time; nothing ever sleeps.
pub struct TokenBucket {
    limit: Limit,
    burst: i32,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(limit: Limit, burst: i32) -> Self {
        Self {
            limit,
            burst,
            state: Mutex::new(BucketState {
                tokens: burst.max(0) as f64,
                last_update: Instant::now(),
            }),
        }
    }

    pub fn limit(&self) -> Limit {
        self.limit
    }

    pub fn burst(&self) -> i32 {
        self.burst
    }

    /// Take one token if available.
    pub fn allow(&self) -> bool {
        if self.limit.is_unlimited() {
            return true;
        }
        let capacity = self.burst.max(0) as f64;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_update).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.limit.per_second()).min(capacity);
        state.last_update = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for TokenBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBucket")
            .field("limit", &self.limit)
            .field("burst", &self.burst)
            .finish()
    }
}
