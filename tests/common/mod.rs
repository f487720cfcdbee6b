//! Shared helpers for integration tests.

use std::time::Duration;

use route_policy::controller::{ControllerTable, Route};
use route_policy::policy::{ProxyConfig, RateLimiterConfig, RetryConfig, TimeoutConfig};

/// A policy file exercising both tables.
#[allow(dead_code)]
pub const POLICY_TOML: &str = r#"
[logging]
level = "debug"

[egress]
bypass = ["/health"]
default = { timeout = { timeout_ms = 5000 } }

[[egress.routes]]
name = "search"
pattern = "google.com/search"
timeout = { timeout_ms = 1500, status_code = 503 }
rate_limiter = { limit = 100.0, burst = 10 }
retry = { status_codes = [503, 504], limit = 5.0, burst = 2 }
proxy = { enabled = true, pattern = "http://localhost:9000" }

[[egress.routes]]
name = "api"
pattern = "/api"
rate_limiter = { limit = -1.0 }

[[egress.routes]]
name = "api-v2"
pattern = "/api/v2"
retry = { status_codes = [502], enabled = false }

[ingress.host]
rate_limiter = { limit = 1000.0, burst = 100 }
proxy = { pattern = "http:" }
"#;

/// A route with every file-configurable capability.
#[allow(dead_code)]
pub fn full_route(name: &str) -> Route {
    Route::named(name)
        .with(TimeoutConfig::new(Duration::from_millis(1500), 0))
        .with(RateLimiterConfig::new(100.0, 100, 0))
        .with(RetryConfig::new(vec![503, 504], 10.0, 5, Duration::ZERO))
        .with(ProxyConfig::new(false, "http://localhost:8080"))
}

/// An egress table holding `names`, each built by [`full_route`].
#[allow(dead_code)]
pub fn table_with(names: &[&str]) -> ControllerTable {
    let table = ControllerTable::new(true, false);
    for name in names {
        table.add_controller(full_route(name)).unwrap();
    }
    table
}
