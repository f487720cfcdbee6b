//! Policy metrics.
//!
//! # Metrics
//! - `policy_rate_limited_total` (counter): requests refused by a route limiter, by route
//! - `policy_retry_decisions_total` (counter): refused retries, by route and flag (`NE`, `RL`)
//! - `policy_reconfigurations_total` (counter): controller swaps, by route and capability
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder every call is a no-op
//! - Labels are route names, which are bounded by configuration

pub fn record_rate_limited(route: &str) {
    ::metrics::counter!("policy_rate_limited_total", "route" => route.to_string()).increment(1);
}

pub fn record_retry_refused(route: &str, flag: &'static str) {
    ::metrics::counter!(
        "policy_retry_decisions_total",
        "route" => route.to_string(),
        "flag" => flag
    )
    .increment(1);
}

pub fn record_reconfiguration(route: &str, capability: &'static str) {
    ::metrics::counter!(
        "policy_reconfigurations_total",
        "route" => route.to_string(),
        "capability" => capability
    )
    .increment(1);
}
