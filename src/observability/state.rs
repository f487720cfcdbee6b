//! Policy state export for access logging.
//!
//! Each function writes its canonical keys into a string map, using fixed sentinels when
//! the capability is absent so every log line carries the same columns:
//!
//! ```text
//! absent numeric value   → "-1"
//! absent flag            → ""
//! unlimited rate         → "99999"
//! ```

use std::collections::BTreeMap;

use crate::controller::shared::{
    CONTROLLER_NAME, FAILOVER_NAME, PROXY_NAME, RATE_BURST_NAME, RATE_LIMIT_NAME,
    RETRY_NAME, RETRY_RATE_BURST_NAME, RETRY_RATE_LIMIT_NAME, TIMEOUT_NAME,
};
use crate::controller::Controller;
use crate::policy::{Failover, Limit, Proxy, RateLimiter, Retry, Timeout};

/// Rate written for an unlimited limiter.
pub const RATE_LIMIT_INF_VALUE: &str = "99999";

const ABSENT_VALUE: &str = "-1";

pub type StateMap = BTreeMap<String, String>;

fn limit_value(limit: Limit) -> String {
    if limit.is_unlimited() {
        RATE_LIMIT_INF_VALUE.to_string()
    } else {
        limit.to_string()
    }
}

fn flag(value: Option<bool>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Timeout in milliseconds.
pub fn timeout_state(m: &mut StateMap, timeout: Option<&Timeout>) {
    let value = timeout
        .map(|t| t.duration().as_millis().to_string())
        .unwrap_or_else(|| ABSENT_VALUE.to_string());
    m.insert(TIMEOUT_NAME.to_string(), value);
}

pub fn rate_limiter_state(m: &mut StateMap, limiter: Option<&RateLimiter>) {
    let (limit, burst) = match limiter.map(RateLimiter::limit_and_burst) {
        Some((limit, burst)) => (limit_value(limit), burst.to_string()),
        None => (ABSENT_VALUE.to_string(), ABSENT_VALUE.to_string()),
    };
    m.insert(RATE_LIMIT_NAME.to_string(), limit);
    m.insert(RATE_BURST_NAME.to_string(), burst);
}

/// `retried` is whether the request being logged was retried.
pub fn retry_state(m: &mut StateMap, retry: Option<&Retry>, retried: bool) {
    let (limit, burst) = match retry.map(Retry::limit_and_burst) {
        Some((limit, burst)) => (limit_value(limit), burst.to_string()),
        None => (ABSENT_VALUE.to_string(), ABSENT_VALUE.to_string()),
    };
    m.insert(RETRY_NAME.to_string(), flag(retry.map(|_| retried)));
    m.insert(RETRY_RATE_LIMIT_NAME.to_string(), limit);
    m.insert(RETRY_RATE_BURST_NAME.to_string(), burst);
}

/// `failed_over` is whether the request being logged was failed over.
pub fn failover_state(m: &mut StateMap, failover: Option<&Failover>, failed_over: bool) {
    m.insert(FAILOVER_NAME.to_string(), flag(failover.map(|_| failed_over)));
}

pub fn proxy_state(m: &mut StateMap, proxy: Option<&Proxy>) {
    m.insert(PROXY_NAME.to_string(), flag(proxy.map(Proxy::is_enabled)));
}

/// Full state of one controller for a request that was neither retried nor failed over.
pub fn controller_state(ctrl: &Controller) -> StateMap {
    request_state(ctrl, false, false)
}

/// Full state of one controller for a logged request.
pub fn request_state(ctrl: &Controller, retried: bool, failed_over: bool) -> StateMap {
    let mut m = StateMap::new();
    m.insert(CONTROLLER_NAME.to_string(), ctrl.name().to_string());
    timeout_state(&mut m, ctrl.timeout());
    rate_limiter_state(&mut m, ctrl.rate_limiter());
    retry_state(&mut m, ctrl.retry(), retried);
    failover_state(&mut m, ctrl.failover(), failed_over);
    proxy_state(&mut m, ctrl.proxy());
    m
}
