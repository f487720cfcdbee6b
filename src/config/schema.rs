//! Configuration schema definitions.
//!
//! This module defines the policy file structure: one table section per traffic
//! direction, each holding its routes and optional default and host controllers.
//! All types derive Serde traits for deserialization from config files.
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [egress]
//! bypass = ["/health"]
//!
//! [[egress.routes]]
//! name = "search"
//! pattern = "/search"
//! timeout = { timeout_ms = 1500 }
//! rate_limiter = { limit = 100.0, burst = 10 }
//! retry = { status_codes = [503, 504], limit = 5.0, burst = 2 }
//! proxy = { enabled = true, pattern = "http://google.com" }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::controller::{Route, Traffic};
use crate::policy::{Limit, ProxyConfig, RateLimiterConfig, RetryConfig, TimeoutConfig, DEFAULT_BURST};

/// Root of a policy file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PolicyFile {
    /// Log settings for the binary.
    pub logging: LoggingConfig,

    /// Outbound traffic table.
    pub egress: TableFile,

    /// Inbound traffic table.
    pub ingress: TableFile,
}

impl PolicyFile {
    pub fn table(&self, traffic: Traffic) -> &TableFile {
        match traffic {
            Traffic::Ingress => &self.ingress,
            Traffic::Egress | Traffic::Ping => &self.egress,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// One controller table.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TableFile {
    /// Replaces the built-in default controller.
    pub default: Option<RouteFile>,

    /// Host controller. Ingress only.
    pub host: Option<RouteFile>,

    /// Path prefixes that bypass all policy.
    pub bypass: Vec<String>,

    /// Route controllers, matched by pattern.
    pub routes: Vec<RouteFile>,
}

/// One route and its capabilities. Omitted sections leave the capability absent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouteFile {
    /// Route identifier for lookup, logging and metrics.
    pub name: String,

    /// Host and/or path prefix, e.g. `/api` or `example.com/api`.
    pub pattern: String,

    pub timeout: Option<TimeoutFile>,
    pub rate_limiter: Option<RateLimiterFile>,
    pub retry: Option<RetryFile>,
    pub proxy: Option<ProxyFile>,
}

impl RouteFile {
    /// Convert into a route for `traffic`.
    ///
    /// Negative limits mean unlimited in files, so they are normalized here; every
    /// other value is passed through for the controller to validate.
    pub fn to_route(&self, traffic: Traffic) -> Route {
        let mut route = Route::new(self.name.clone(), traffic, self.pattern.clone(), false);
        if let Some(t) = &self.timeout {
            route = route.with(TimeoutConfig::new(Duration::from_millis(t.timeout_ms), t.status_code));
        }
        if let Some(r) = &self.rate_limiter {
            route = route.with(RateLimiterConfig::new(file_limit(r.limit), r.burst, r.status_code));
        }
        if let Some(r) = &self.retry {
            let mut config = RetryConfig::new(
                r.status_codes.clone(),
                file_limit(r.limit),
                r.burst,
                Duration::from_millis(r.wait_ms),
            );
            config.enabled = r.enabled;
            route = route.with(config);
        }
        if let Some(p) = &self.proxy {
            route = route.with(ProxyConfig::new(p.enabled, p.pattern.clone()));
        }
        route
    }
}

fn file_limit(limit: f64) -> Limit {
    if limit < 0.0 {
        Limit::UNLIMITED
    } else {
        Limit::new(limit)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutFile {
    /// Budget in milliseconds. Must be positive.
    pub timeout_ms: u64,

    /// Status returned on timeout; 0 selects 504.
    pub status_code: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimiterFile {
    /// Requests per second; negative is unlimited.
    pub limit: f64,

    pub burst: i32,

    /// Status returned when limited; 0 selects 429.
    pub status_code: u16,
}

impl Default for RateLimiterFile {
    fn default() -> Self {
        Self {
            limit: -1.0,
            burst: DEFAULT_BURST,
            status_code: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryFile {
    /// Response status codes eligible for retry.
    pub status_codes: Vec<u16>,

    /// Retries per second; negative is unlimited.
    pub limit: f64,

    pub burst: i32,

    /// Delay before a retry, in milliseconds.
    pub wait_ms: u64,

    pub enabled: bool,
}

impl Default for RetryFile {
    fn default() -> Self {
        Self {
            status_codes: Vec::new(),
            limit: -1.0,
            burst: DEFAULT_BURST,
            wait_ms: 0,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyFile {
    pub enabled: bool,

    /// Outbound URL pattern, e.g. `http:` or `http://google.com/search`.
    pub pattern: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let file: PolicyFile = toml::from_str("").unwrap();
        assert_eq!(file.logging.level, "info");
        assert!(file.egress.routes.is_empty());
        assert!(file.ingress.host.is_none());
    }

    #[test]
    fn test_to_route() {
        let file: PolicyFile = toml::from_str(
            r#"
            [[ingress.routes]]
            name = "api"
            pattern = "/api"
            timeout = { timeout_ms = 1500 }
            rate_limiter = { limit = -1.0, burst = 5 }
            retry = { status_codes = [503], limit = 2.5, enabled = false }
            proxy = { enabled = true, pattern = "http://localhost:9000" }
            "#,
        )
        .unwrap();

        let route = file.ingress.routes[0].to_route(Traffic::Ingress);
        assert_eq!(route.name, "api");
        assert_eq!(route.pattern, "/api");
        assert_eq!(route.traffic, Traffic::Ingress);

        let timeout = route.timeout.unwrap();
        assert_eq!(timeout.duration, Duration::from_millis(1500));
        assert_eq!(timeout.status_code, 504);

        let limiter = route.rate_limiter.unwrap();
        assert!(limiter.limit.is_unlimited());
        assert_eq!(limiter.burst, 5);
        assert_eq!(limiter.status_code, 429);

        let retry = route.retry.unwrap();
        assert_eq!(retry.limit, Limit::new(2.5));
        assert_eq!(retry.burst, DEFAULT_BURST);
        assert!(!retry.enabled);

        assert_eq!(route.proxy.unwrap(), ProxyConfig::new(true, "http://localhost:9000"));
        assert!(route.failover.is_none());
    }
}
