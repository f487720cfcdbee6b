//! Per-route token-bucket rate limiter with percentage adjustment.

use std::fmt;

use crate::controller::core::Owner;
use crate::error::ControllerError;
use crate::observability::metrics;
use crate::policy::token_bucket::{normalize, Limit, TokenBucket, DEFAULT_BURST};

/// Status returned to callers when a request is not admitted.
pub const DEFAULT_RATE_LIMITED_STATUS: u16 = 429;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiterConfig {
    pub limit: Limit,
    pub burst: i32,
    pub status_code: u16,
}

impl RateLimiterConfig {
    /// A zero status code becomes 429. Negative values are kept as given and fail validation.
    pub fn new(limit: impl Into<Limit>, burst: i32, status_code: u16) -> Self {
        Self {
            limit: limit.into(),
            burst,
            status_code: if status_code == 0 {
                DEFAULT_RATE_LIMITED_STATUS
            } else {
                status_code
            },
        }
    }

    pub(crate) fn validate(&self) -> Vec<ControllerError> {
        let mut errors = Vec::new();
        if self.limit.is_negative() {
            errors.push(ControllerError::config("RateLimiter limit is < 0"));
        }
        if self.burst < 0 {
            errors.push(ControllerError::config("RateLimiter burst is < 0"));
        }
        errors
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new(Limit::UNLIMITED, DEFAULT_BURST, 0)
    }
}

/// Admission decision for one route.
///
/// Every reconfiguration publishes a new limiter with a fresh, full bucket.
pub struct RateLimiter {
    owner: Owner,
    config: RateLimiterConfig,
    bucket: TokenBucket,
}

impl RateLimiter {
    pub(crate) fn new(owner: Owner, config: RateLimiterConfig) -> Self {
        Self {
            bucket: TokenBucket::new(config.limit, config.burst),
            owner,
            config,
        }
    }

    pub(crate) fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Take one token. Unlimited limiters never touch the bucket.
    pub fn allow(&self) -> bool {
        if self.config.limit.is_unlimited() {
            return true;
        }
        let allowed = self.bucket.allow();
        if !allowed {
            metrics::record_rate_limited(self.owner.name());
        }
        allowed
    }

    /// Status to answer with when [`allow`](Self::allow) is false.
    pub fn status_code(&self) -> u16 {
        self.config.status_code
    }

    pub fn limit_and_burst(&self) -> (Limit, i32) {
        (self.config.limit, self.config.burst)
    }

    pub fn set_limit(&self, limit: Limit) {
        if self.config.limit == limit {
            return;
        }
        if let Some(table) = self.owner.table() {
            table.set_rate_limit(&self.owner, limit);
        }
    }

    pub fn set_burst(&self, burst: i32) {
        if self.config.burst == burst {
            return;
        }
        if let Some(table) = self.owner.table() {
            table.set_rate_burst(&self.owner, burst);
        }
    }

    /// Replace limit and burst. A negative limit means unlimited, a negative burst the default.
    pub fn set_rate_limiter(&self, limit: Limit, burst: i32) {
        let (limit, burst) = normalize(limit, burst);
        if self.config.limit == limit && self.config.burst == burst {
            return;
        }
        if let Some(table) = self.owner.table() {
            table.set_rate_limiter(&self.owner, limit, burst);
        }
    }

    /// Move limit and burst by `percentage` of their current values.
    ///
    /// Returns false, changing nothing, when the burst delta rounds to zero, when
    /// either delta would reach or pass zero, or when the new burst overflows.
    /// Also false when the table no longer publishes this controller.
    pub fn adjust_rate_limiter(&self, percentage: i32) -> bool {
        let Some(limit) = limit_adjust(self.config.limit.per_second(), percentage) else {
            return false;
        };
        let Some(burst) = burst_adjust(self.config.burst, percentage) else {
            return false;
        };
        match self.owner.table() {
            Some(table) => table.set_rate_limiter(&self.owner, Limit::new(limit), burst),
            None => false,
        }
    }
}

fn limit_adjust(value: f64, percentage: i32) -> Option<f64> {
    let change = (f64::from(percentage).abs() / 100.0) * value;
    if change >= value {
        return None;
    }
    if percentage > 0 {
        Some(value + change)
    } else {
        Some(value - change)
    }
}

fn burst_adjust(value: i32, percentage: i32) -> Option<i32> {
    let change = ((f64::from(percentage).abs() / 100.0) * f64::from(value)).round() as i32;
    if change == 0 || change >= value {
        return None;
    }
    if percentage > 0 {
        value.checked_add(change)
    } else {
        value.checked_sub(change)
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.owner.name())
            .field("config", &self.config)
            .finish()
    }
}
