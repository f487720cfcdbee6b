//! Retry eligibility.
//!
//! # States
//! - Enabled: status codes in the retryable set are admitted, subject to a
//!   retry-scoped rate limiter that bounds retry volume.
//! - Disabled: nothing is eligible.
//!
//! # Decision order
//! ```text
//! Disabled                      → (false, "NE")
//! status not in retryable set   → (false, "")
//! retry limiter rejects         → (false, "RL")
//! otherwise                     → (true, "")
//! ```
//!
//! The flags are consumed verbatim by access logging.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::controller::core::Owner;
use crate::error::ControllerError;
use crate::observability::metrics;
use crate::policy::token_bucket::{normalize, Limit, TokenBucket};

/// Retry refused because the policy is disabled.
pub const NOT_ELIGIBLE_FLAG: &str = "NE";
/// Retry refused by the retry limiter.
pub const RATE_LIMITED_FLAG: &str = "RL";

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub status_codes: Vec<u16>,
    pub limit: Limit,
    pub burst: i32,
    /// Delay the executor should wait before retrying.
    pub wait: Duration,
    pub enabled: bool,
}

impl RetryConfig {
    /// An enabled retry policy.
    pub fn new(status_codes: Vec<u16>, limit: impl Into<Limit>, burst: i32, wait: Duration) -> Self {
        Self {
            status_codes,
            limit: limit.into(),
            burst,
            wait,
            enabled: true,
        }
    }

    /// Same policy, starting disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub(crate) fn validate(&self) -> Vec<ControllerError> {
        let mut errors = Vec::new();
        if self.status_codes.is_empty() {
            errors.push(ControllerError::config("Retry status codes are empty"));
        }
        if self.limit.is_negative() {
            errors.push(ControllerError::config("Retry rate limit is < 0"));
        }
        if self.burst < 0 {
            errors.push(ControllerError::config("Retry burst is < 0"));
        }
        errors
    }
}

pub struct Retry {
    owner: Owner,
    config: RetryConfig,
    // Shared across enable/disable swaps; replaced when limit or burst change.
    limiter: Arc<TokenBucket>,
}

impl Retry {
    pub(crate) fn new(owner: Owner, config: RetryConfig) -> Self {
        Self {
            limiter: Arc::new(TokenBucket::new(config.limit, config.burst)),
            owner,
            config,
        }
    }

    pub(crate) fn with_enabled(&self, enabled: bool) -> Retry {
        let mut config = self.config.clone();
        config.enabled = enabled;
        Retry {
            owner: self.owner.clone(),
            config,
            limiter: self.limiter.clone(),
        }
    }

    pub(crate) fn with_rate_limiter(&self, limit: Limit, burst: i32) -> Retry {
        let mut config = self.config.clone();
        config.limit = limit;
        config.burst = burst;
        Retry::new(self.owner.clone(), config)
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn enable(&self) {
        if self.config.enabled {
            return;
        }
        if let Some(table) = self.owner.table() {
            table.set_retry_enabled(&self.owner, true);
        }
    }

    pub fn disable(&self) {
        if !self.config.enabled {
            return;
        }
        if let Some(table) = self.owner.table() {
            table.set_retry_enabled(&self.owner, false);
        }
    }

    pub fn wait(&self) -> Duration {
        self.config.wait
    }

    pub fn limit_and_burst(&self) -> (Limit, i32) {
        (self.config.limit, self.config.burst)
    }

    /// Replace the retry limiter. A negative limit means unlimited, a negative burst the default.
    pub fn set_rate_limiter(&self, limit: Limit, burst: i32) {
        let (limit, burst) = normalize(limit, burst);
        if self.config.limit == limit && self.config.burst == burst {
            return;
        }
        if let Some(table) = self.owner.table() {
            table.set_retry_rate_limiter(&self.owner, limit, burst);
        }
    }

    /// Whether a response with `status_code` may be retried, with its access-log flag.
    pub fn is_retryable(&self, status_code: u16) -> (bool, &'static str) {
        let (ok, flag) = self.decide(status_code);
        if !flag.is_empty() {
            metrics::record_retry_refused(self.owner.name(), flag);
        }
        (ok, flag)
    }

    fn decide(&self, status_code: u16) -> (bool, &'static str) {
        if !self.config.enabled {
            return (false, NOT_ELIGIBLE_FLAG);
        }
        if !self.config.status_codes.contains(&status_code) {
            return (false, "");
        }
        if !self.limiter.allow() {
            return (false, RATE_LIMITED_FLAG);
        }
        (true, "")
    }
}

impl fmt::Debug for Retry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("name", &self.owner.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Controller, ControllerTable, Route};
    use crate::policy::DEFAULT_BURST;

    fn setup(config: RetryConfig) -> ControllerTable {
        let table = ControllerTable::new(true, false);
        table.add_controller(Route::named("test-route").with(config)).unwrap();
        assert_eq!(table.count(), 1);
        table
    }

    fn lookup(table: &ControllerTable) -> Arc<Controller> {
        table.lookup_by_name("test-route").unwrap()
    }

    #[test]
    fn test_new_retry() {
        let table = setup(RetryConfig::new(vec![504], 5.0, 10, Duration::ZERO));
        let ctrl = lookup(&table);
        let retry = ctrl.retry().unwrap();
        assert_eq!(retry.limit_and_burst(), (Limit::new(5.0), 10));
        assert_eq!(retry.config().status_codes, vec![504]);
        assert!(retry.is_enabled());
        assert_eq!(retry.wait(), Duration::ZERO);
    }

    #[test]
    fn test_enable_disable() {
        let table = setup(RetryConfig::new(vec![504], 5.0, 10, Duration::ZERO));

        let ctrl = lookup(&table);
        assert!(ctrl.retry().unwrap().is_enabled());

        ctrl.retry().unwrap().disable();
        let disabled = lookup(&table);
        assert!(!disabled.retry().unwrap().is_enabled());
        // The earlier snapshot still reads as enabled.
        assert!(ctrl.retry().unwrap().is_enabled());

        disabled.retry().unwrap().enable();
        assert!(lookup(&table).retry().unwrap().is_enabled());
    }

    #[test]
    fn test_enable_unchanged_keeps_controller() {
        let table = setup(RetryConfig::new(vec![504], 5.0, 10, Duration::ZERO));
        let before = lookup(&table);
        before.retry().unwrap().enable();
        assert!(Arc::ptr_eq(&before, &lookup(&table)));

        before.retry().unwrap().disable();
        let disabled = lookup(&table);
        assert!(!Arc::ptr_eq(&before, &disabled));
        disabled.retry().unwrap().disable();
        assert!(Arc::ptr_eq(&disabled, &lookup(&table)));
    }

    #[test]
    fn test_set_rate_limiter_normalizes() {
        let table = setup(RetryConfig::new(vec![503], 5.0, 10, Duration::ZERO));
        lookup(&table).retry().unwrap().set_rate_limiter(Limit::new(-1.0), -1);
        let ctrl = lookup(&table);
        assert_eq!(
            ctrl.retry().unwrap().limit_and_burst(),
            (Limit::UNLIMITED, DEFAULT_BURST)
        );

        // Same values after normalization leave the controller in place.
        ctrl.retry().unwrap().set_rate_limiter(Limit::new(-5.0), -3);
        ctrl.retry().unwrap().set_rate_limiter(Limit::UNLIMITED, DEFAULT_BURST);
        assert!(Arc::ptr_eq(&ctrl, &lookup(&table)));
    }

    #[test]
    fn test_disabled_in_config() {
        let table = setup(RetryConfig::new(vec![503], 5.0, 10, Duration::ZERO).disabled());
        assert!(!lookup(&table).retry().unwrap().is_enabled());
    }

    #[test]
    fn test_is_retryable_disabled() {
        let table = setup(RetryConfig::new(vec![503, 504], 100.0, 10, Duration::ZERO));
        lookup(&table).retry().unwrap().disable();

        let ctrl = lookup(&table);
        let retry = ctrl.retry().unwrap();
        assert_eq!(retry.is_retryable(200), (false, NOT_ELIGIBLE_FLAG));
        assert_eq!(retry.is_retryable(503), (false, NOT_ELIGIBLE_FLAG));
        assert_eq!(retry.is_retryable(504), (false, NOT_ELIGIBLE_FLAG));
    }

    #[test]
    fn test_is_retryable_status_code() {
        let table = setup(RetryConfig::new(vec![503, 504], 100.0, 10, Duration::ZERO));
        lookup(&table).retry().unwrap().enable();

        let ctrl = lookup(&table);
        let retry = ctrl.retry().unwrap();
        assert_eq!(retry.is_retryable(200), (false, ""));
        assert_eq!(retry.is_retryable(500), (false, ""));
        assert_eq!(retry.is_retryable(502), (false, ""));
        assert_eq!(retry.is_retryable(503), (true, ""));
        assert_eq!(retry.is_retryable(504), (true, ""));
        assert_eq!(retry.is_retryable(505), (false, ""));
    }

    #[test]
    fn test_is_retryable_rate_limit() {
        let table = setup(RetryConfig::new(vec![503, 504], 1.0, 1, Duration::ZERO));

        let ctrl = lookup(&table);
        let retry = ctrl.retry().unwrap();
        assert_eq!(retry.is_retryable(503), (true, ""));
        assert_eq!(retry.is_retryable(504), (false, RATE_LIMITED_FLAG));

        retry.set_rate_limiter(Limit::new(100.0), 10);
        let ctrl = lookup(&table);
        let retry = ctrl.retry().unwrap();
        assert_eq!(retry.is_retryable(503), (true, ""));
        assert_eq!(retry.is_retryable(504), (true, ""));
    }

    #[test]
    fn test_disable_keeps_limiter_state() {
        let table = setup(RetryConfig::new(vec![503], 0.001, 1, Duration::ZERO));
        assert_eq!(lookup(&table).retry().unwrap().is_retryable(503), (true, ""));

        lookup(&table).retry().unwrap().disable();
        lookup(&table).retry().unwrap().enable();
        // Toggling does not refill the retry budget.
        assert_eq!(
            lookup(&table).retry().unwrap().is_retryable(503),
            (false, RATE_LIMITED_FLAG)
        );
    }

    #[test]
    fn test_validate() {
        let config = RetryConfig::new(Vec::new(), -1.0, -1, Duration::ZERO);
        let errors: Vec<String> = config.validate().iter().map(ToString::to_string).collect();
        assert_eq!(
            errors,
            vec![
                "invalid configuration: Retry status codes are empty",
                "invalid configuration: Retry rate limit is < 0",
                "invalid configuration: Retry burst is < 0",
            ]
        );
    }
}
