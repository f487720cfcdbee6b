//! Declarative route configuration.

use crate::controller::shared::Traffic;
use crate::error::{ControllerError, Result};
use crate::policy::{FailoverConfig, ProxyConfig, RateLimiterConfig, RetryConfig, TimeoutConfig};

/// One capability config, so a route can be assembled from any mix of them.
#[derive(Debug, Clone)]
pub enum PolicyConfig {
    Timeout(TimeoutConfig),
    RateLimiter(RateLimiterConfig),
    Retry(RetryConfig),
    Failover(FailoverConfig),
    Proxy(ProxyConfig),
}

impl From<TimeoutConfig> for PolicyConfig {
    fn from(config: TimeoutConfig) -> Self {
        PolicyConfig::Timeout(config)
    }
}

impl From<RateLimiterConfig> for PolicyConfig {
    fn from(config: RateLimiterConfig) -> Self {
        PolicyConfig::RateLimiter(config)
    }
}

impl From<RetryConfig> for PolicyConfig {
    fn from(config: RetryConfig) -> Self {
        PolicyConfig::Retry(config)
    }
}

impl From<FailoverConfig> for PolicyConfig {
    fn from(config: FailoverConfig) -> Self {
        PolicyConfig::Failover(config)
    }
}

impl From<ProxyConfig> for PolicyConfig {
    fn from(config: ProxyConfig) -> Self {
        PolicyConfig::Proxy(config)
    }
}

/// Input to controller construction. Omitted configs leave that capability absent.
#[derive(Debug, Clone, Default)]
pub struct Route {
    pub name: String,
    pub traffic: Traffic,
    pub pattern: String,
    pub is_host: bool,
    pub timeout: Option<TimeoutConfig>,
    pub rate_limiter: Option<RateLimiterConfig>,
    pub retry: Option<RetryConfig>,
    pub failover: Option<FailoverConfig>,
    pub proxy: Option<ProxyConfig>,
}

impl Route {
    pub fn new(name: impl Into<String>, traffic: Traffic, pattern: impl Into<String>, is_host: bool) -> Self {
        Self {
            name: name.into(),
            traffic,
            pattern: pattern.into(),
            is_host,
            ..Default::default()
        }
    }

    /// An egress route with no pattern.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Traffic::Egress, "", false)
    }

    /// Attach a capability config. A later config of the same kind replaces an earlier one.
    pub fn with(mut self, config: impl Into<PolicyConfig>) -> Self {
        match config.into() {
            PolicyConfig::Timeout(c) => self.timeout = Some(c),
            PolicyConfig::RateLimiter(c) => self.rate_limiter = Some(c),
            PolicyConfig::Retry(c) => self.retry = Some(c),
            PolicyConfig::Failover(c) => self.failover = Some(c),
            PolicyConfig::Proxy(c) => self.proxy = Some(c),
        }
        self
    }

    /// Attach every config in `configs`.
    pub fn with_all<I>(self, configs: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PolicyConfig>,
    {
        configs.into_iter().fold(self, |route, config| route.with(config))
    }

    /// True if any capability is configured.
    pub fn is_configured(&self) -> bool {
        self.timeout.is_some()
            || self.rate_limiter.is_some()
            || self.retry.is_some()
            || self.failover.is_some()
            || self.proxy.is_some()
    }

    /// Check every configured capability, collecting all errors.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<ControllerError> = Vec::new();
        if let Some(c) = &self.timeout {
            errors.extend(c.validate());
        }
        if let Some(c) = &self.rate_limiter {
            errors.extend(c.validate());
        }
        if let Some(c) = &self.retry {
            errors.extend(c.validate());
        }
        if let Some(c) = &self.failover {
            errors.extend(c.validate());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
