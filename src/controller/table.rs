//! Concurrent, name-indexed controller table for one traffic direction.
//!
//! # Locking
//! One reader/writer lock guards the route map, the three sentinel controllers and the
//! two matchers. Readers copy out an `Arc<Controller>` and release the lock at once;
//! published controllers are immutable, so a reader keeps a consistent snapshot for as
//! long as it holds the `Arc`. Every reconfiguration replaces a whole controller under
//! the write lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;

use crate::controller::core::{Controller, ControllerKind, Owner};
use crate::controller::route::Route;
use crate::controller::shared::{
    DEFAULT_CONTROLLER_NAME, FAILOVER_NAME, HOST_CONTROLLER_NAME, NIL_CONTROLLER_NAME, PROXY_NAME,
    RATE_LIMIT_NAME, RETRY_NAME, TIMEOUT_NAME,
};
use crate::error::{join_errors, ControllerError, Result};
use crate::observability::metrics;
use crate::policy::{Failover, Limit, Proxy, RateLimiter, RateLimiterConfig, Timeout};

/// Resolves a request to a route name.
///
/// `None` means unmatched: the table answers with the no-op controller. `Some("")`
/// means matched without a specific route: the table answers with the default.
pub type HttpMatcher = Arc<dyn Fn(&Request<Body>) -> Option<String> + Send + Sync>;

/// Resolves a URI and method to a route name, with the same contract as [`HttpMatcher`].
pub type UriMatcher = Arc<dyn Fn(&str, &str) -> Option<String> + Send + Sync>;

/// Non-owning reference from a controller back to its table.
#[derive(Debug, Clone)]
pub(crate) struct TableRef(Weak<TableShared>);

impl TableRef {
    /// A reference to no table; updates through it are ignored.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        TableRef(Weak::new())
    }

    pub(crate) fn upgrade(&self) -> Option<Arc<TableShared>> {
        self.0.upgrade()
    }
}

struct TableState {
    http_match: HttpMatcher,
    uri_match: UriMatcher,
    host: Arc<Controller>,
    default: Arc<Controller>,
    nil: Arc<Controller>,
    controllers: HashMap<String, Arc<Controller>>,
}

pub(crate) struct TableShared {
    egress: bool,
    allow_default: bool,
    state: RwLock<TableState>,
}

/// Registry and resolver of controllers for one traffic direction.
///
/// Cloning is cheap and yields a handle to the same table.
#[derive(Clone)]
pub struct ControllerTable {
    shared: Arc<TableShared>,
}

impl ControllerTable {
    /// Table for outbound traffic.
    pub fn egress() -> Self {
        Self::new(true, true)
    }

    /// Table for inbound traffic.
    pub fn ingress() -> Self {
        Self::new(false, true)
    }

    /// When `allow_default` is false, [`lookup_by_name`](Self::lookup_by_name) answers
    /// unknown names with `None` instead of the default controller.
    pub fn new(egress: bool, allow_default: bool) -> Self {
        let shared = Arc::new_cyclic(|weak: &Weak<TableShared>| {
            let table = TableRef(weak.clone());
            TableShared {
                egress,
                allow_default,
                state: RwLock::new(TableState {
                    http_match: Arc::new(|_: &Request<Body>| Some(String::new())),
                    uri_match: Arc::new(|_: &str, _: &str| Some(String::new())),
                    host: Arc::new(Controller::sentinel(
                        HOST_CONTROLLER_NAME,
                        ControllerKind::Host,
                        table.clone(),
                    )),
                    default: Arc::new(Controller::sentinel(
                        DEFAULT_CONTROLLER_NAME,
                        ControllerKind::Default,
                        table.clone(),
                    )),
                    nil: Arc::new(Controller::sentinel(
                        NIL_CONTROLLER_NAME,
                        ControllerKind::Nil,
                        table,
                    )),
                    controllers: HashMap::with_capacity(100),
                }),
            }
        });
        Self { shared }
    }

    fn table_ref(&self) -> TableRef {
        TableRef(Arc::downgrade(&self.shared))
    }

    pub fn is_egress(&self) -> bool {
        self.shared.egress
    }

    /// Replace the request matcher.
    pub fn set_http_matcher<F>(&self, matcher: F)
    where
        F: Fn(&Request<Body>) -> Option<String> + Send + Sync + 'static,
    {
        self.shared.write().http_match = Arc::new(matcher);
    }

    /// Replace the URI matcher.
    pub fn set_uri_matcher<F>(&self, matcher: F)
    where
        F: Fn(&str, &str) -> Option<String> + Send + Sync + 'static,
    {
        self.shared.write().uri_match = Arc::new(matcher);
    }

    /// Register a route controller. Nothing is registered on any error.
    pub fn add_controller(&self, route: Route) -> Result<()> {
        if route.name.trim().is_empty() {
            return Err(vec![ControllerError::argument("route name is empty")]);
        }
        let ctrl = Controller::build(&route, ControllerKind::Route, self.table_ref())
            .inspect_err(|errs| reject(&route.name, errs))?;

        let mut state = self.shared.write();
        if state.controllers.contains_key(&route.name) {
            let errs = vec![ControllerError::argument(format!(
                "route name is a duplicate [{}]",
                route.name
            ))];
            reject(&route.name, &errs);
            return Err(errs);
        }
        state.controllers.insert(route.name.clone(), Arc::new(ctrl));
        tracing::info!(
            route = %route.name,
            traffic = %self.traffic(),
            "Controller registered"
        );
        Ok(())
    }

    /// Replace the host controller. Ingress only; retry, timeout and failover are refused.
    pub fn set_host_controller(&self, mut route: Route) -> Result<()> {
        if self.is_egress() {
            let errs = vec![ControllerError::argument(
                "host controller configuration is not valid for egress traffic",
            )];
            reject(HOST_CONTROLLER_NAME, &errs);
            return Err(errs);
        }
        if route.retry.is_some() || route.timeout.is_some() || route.failover.is_some() {
            let errs = vec![ControllerError::argument(
                "host controller configuration does not allow retry, timeout, or failover controllers",
            )];
            reject(HOST_CONTROLLER_NAME, &errs);
            return Err(errs);
        }
        route.name = HOST_CONTROLLER_NAME.to_string();
        let ctrl = Controller::build(&route, ControllerKind::Host, self.table_ref())
            .inspect_err(|errs| reject(HOST_CONTROLLER_NAME, errs))?;
        self.shared.write().host = Arc::new(ctrl);
        tracing::info!(traffic = %self.traffic(), "Host controller replaced");
        Ok(())
    }

    /// Replace the default controller. An empty name becomes the reserved default name.
    pub fn set_default_controller(&self, mut route: Route) -> Result<()> {
        if route.name.is_empty() {
            route.name = DEFAULT_CONTROLLER_NAME.to_string();
        }
        let ctrl = Controller::build(&route, ControllerKind::Default, self.table_ref())
            .inspect_err(|errs| reject(&route.name, errs))?;
        self.shared.write().default = Arc::new(ctrl);
        tracing::info!(route = %route.name, traffic = %self.traffic(), "Default controller replaced");
        Ok(())
    }

    pub fn host(&self) -> Arc<Controller> {
        self.shared.read().host.clone()
    }

    pub fn default_controller(&self) -> Arc<Controller> {
        self.shared.read().default.clone()
    }

    /// The no-op controller handed out for unmatched traffic.
    pub fn nil(&self) -> Arc<Controller> {
        self.shared.read().nil.clone()
    }

    /// Resolve a request through the installed [`HttpMatcher`].
    pub fn lookup_http(&self, req: &Request<Body>) -> Arc<Controller> {
        let matcher = self.shared.read().http_match.clone();
        self.resolve(matcher(req))
    }

    /// Resolve a URI through the installed [`UriMatcher`].
    pub fn lookup_uri(&self, uri: &str, method: &str) -> Arc<Controller> {
        let matcher = self.shared.read().uri_match.clone();
        self.resolve(matcher(uri, method))
    }

    fn resolve(&self, matched: Option<String>) -> Arc<Controller> {
        let state = self.shared.read();
        let Some(name) = matched else {
            return state.nil.clone();
        };
        if !name.is_empty() {
            if let Some(ctrl) = state.controllers.get(&name) {
                return ctrl.clone();
            }
        }
        state.default.clone()
    }

    /// Controller registered under `name`; unknown names resolve to the default
    /// controller only when the table allows it.
    pub fn lookup_by_name(&self, name: &str) -> Option<Arc<Controller>> {
        if name.is_empty() {
            return None;
        }
        let state = self.shared.read();
        if let Some(ctrl) = state.controllers.get(name) {
            return Some(ctrl.clone());
        }
        if self.shared.allow_default {
            return Some(state.default.clone());
        }
        None
    }

    pub fn exists(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        self.shared.read().controllers.contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.shared.read().controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Registered route names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.read().controllers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn remove(&self, name: &str) {
        if name.is_empty() {
            return;
        }
        if self.shared.write().controllers.remove(name).is_some() {
            tracing::info!(route = %name, traffic = %self.traffic(), "Controller removed");
        }
    }

    fn traffic(&self) -> &'static str {
        self.shared.traffic()
    }
}

impl fmt::Debug for ControllerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerTable")
            .field("egress", &self.shared.egress)
            .field("allow_default", &self.shared.allow_default)
            .field("count", &self.count())
            .finish()
    }
}

fn reject(name: &str, errs: &[ControllerError]) {
    tracing::warn!(route = %name, errors = %join_errors(errs), "Controller configuration rejected");
}

impl TableShared {
    fn read(&self) -> RwLockReadGuard<'_, TableState> {
        // Every write replaces whole values, so a poisoned guard still holds consistent data.
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TableState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn traffic(&self) -> &'static str {
        if self.egress {
            crate::controller::shared::EGRESS_TRAFFIC
        } else {
            crate::controller::shared::INGRESS_TRAFFIC
        }
    }

    /// Copy-on-write replacement of the controller that owns a capability.
    ///
    /// `update` receives the currently published controller and returns its successor,
    /// or `None` when the capability is not configured on it. The read, clone and swap
    /// all happen under the write lock, so concurrent setters never lose an update.
    ///
    /// Returns true only when a new controller was published.
    fn replace<F>(&self, owner: &Owner, capability: &'static str, update: F) -> bool
    where
        F: FnOnce(&Controller) -> Option<Controller>,
    {
        let mut state = self.write();
        let slot = match owner.kind() {
            ControllerKind::Route => state.controllers.get_mut(owner.name()),
            ControllerKind::Host => Some(&mut state.host),
            ControllerKind::Default => Some(&mut state.default),
            ControllerKind::Nil => None,
        };
        let Some(slot) = slot.filter(|ctrl| ctrl.name() == owner.name()) else {
            tracing::debug!(route = %owner.name(), capability, "Controller not published, update skipped");
            return false;
        };
        match update(&**slot) {
            Some(next) => {
                *slot = Arc::new(next);
                tracing::debug!(route = %owner.name(), capability, traffic = self.traffic(), "Controller replaced");
                metrics::record_reconfiguration(owner.name(), capability);
                true
            }
            None => {
                tracing::debug!(route = %owner.name(), capability, "Capability not configured, update skipped");
                false
            }
        }
    }

    pub(crate) fn set_rate_limit(&self, owner: &Owner, limit: Limit) -> bool {
        self.replace(owner, RATE_LIMIT_NAME, |ctrl| {
            let current = ctrl.rate_limiter()?;
            let config = RateLimiterConfig {
                limit,
                ..*current.config()
            };
            Some(ctrl.with_capability(RateLimiter::new(ctrl.owner().clone(), config)))
        })
    }

    pub(crate) fn set_rate_burst(&self, owner: &Owner, burst: i32) -> bool {
        self.replace(owner, RATE_LIMIT_NAME, |ctrl| {
            let current = ctrl.rate_limiter()?;
            let config = RateLimiterConfig {
                burst,
                ..*current.config()
            };
            Some(ctrl.with_capability(RateLimiter::new(ctrl.owner().clone(), config)))
        })
    }

    pub(crate) fn set_rate_limiter(&self, owner: &Owner, limit: Limit, burst: i32) -> bool {
        self.replace(owner, RATE_LIMIT_NAME, |ctrl| {
            let current = ctrl.rate_limiter()?;
            let config = RateLimiterConfig {
                limit,
                burst,
                ..*current.config()
            };
            Some(ctrl.with_capability(RateLimiter::new(ctrl.owner().clone(), config)))
        })
    }

    pub(crate) fn set_retry_enabled(&self, owner: &Owner, enabled: bool) -> bool {
        self.replace(owner, RETRY_NAME, |ctrl| {
            let next = ctrl.retry()?.with_enabled(enabled);
            Some(ctrl.with_capability(next))
        })
    }

    pub(crate) fn set_retry_rate_limiter(&self, owner: &Owner, limit: Limit, burst: i32) -> bool {
        self.replace(owner, RETRY_NAME, |ctrl| {
            let next = ctrl.retry()?.with_rate_limiter(limit, burst);
            Some(ctrl.with_capability(next))
        })
    }

    pub(crate) fn set_timeout(&self, owner: &Owner, duration: Duration) -> bool {
        self.replace(owner, TIMEOUT_NAME, |ctrl| {
            let current = ctrl.timeout()?;
            let mut config = current.config().clone();
            config.duration = duration;
            Some(ctrl.with_capability(Timeout::new(ctrl.owner().clone(), config)))
        })
    }

    pub(crate) fn set_failover_enabled(&self, owner: &Owner, enabled: bool) -> bool {
        self.replace(owner, FAILOVER_NAME, |ctrl| {
            let next: Failover = ctrl.failover()?.with_enabled(enabled);
            Some(ctrl.with_capability(next))
        })
    }

    pub(crate) fn set_proxy_enabled(&self, owner: &Owner, enabled: bool) -> bool {
        self.replace(owner, PROXY_NAME, |ctrl| {
            let current = ctrl.proxy()?;
            let mut config = current.config().clone();
            config.enabled = enabled;
            Some(ctrl.with_capability(Proxy::new(ctrl.owner().clone(), config)))
        })
    }

    pub(crate) fn set_proxy_pattern(&self, owner: &Owner, pattern: &str) -> bool {
        self.replace(owner, PROXY_NAME, |ctrl| {
            let current = ctrl.proxy()?;
            let mut config = current.config().clone();
            config.pattern = pattern.to_string();
            Some(ctrl.with_capability(Proxy::new(ctrl.owner().clone(), config)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{FailoverConfig, ProxyConfig, RetryConfig, TimeoutConfig};

    fn rate_route(name: &str) -> Route {
        Route::named(name).with(RateLimiterConfig::new(100.0, 10, 0))
    }

    #[test]
    fn test_add_controller() {
        let table = ControllerTable::new(true, false);
        assert!(table.is_empty());
        assert!(table.add_controller(rate_route("r1")).is_ok());
        assert_eq!(table.count(), 1);
        assert!(table.exists("r1"));
        assert!(!table.exists(""));
        assert!(!table.exists("r2"));
    }

    #[test]
    fn test_add_controller_empty_name() {
        let table = ControllerTable::egress();
        let errs = table.add_controller(rate_route("")).unwrap_err();
        assert_eq!(errs, vec![ControllerError::argument("route name is empty")]);
        assert_eq!(table.count(), 0);
    }

    #[test]
    fn test_add_controller_duplicate() {
        let table = ControllerTable::egress();
        table.add_controller(rate_route("r1")).unwrap();

        let errs = table.add_controller(rate_route("r1")).unwrap_err();
        assert_eq!(
            errs[0].to_string(),
            "invalid argument: route name is a duplicate [r1]"
        );
        assert_eq!(table.count(), 1);
    }

    #[test]
    fn test_add_controller_invalid_leaves_table_untouched() {
        let table = ControllerTable::egress();
        let route = Route::named("r1")
            .with(TimeoutConfig::new(Duration::ZERO, 0))
            .with(RetryConfig::new(Vec::new(), 1.0, 1, Duration::ZERO));
        let errs = table.add_controller(route).unwrap_err();
        assert_eq!(errs.len(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn test_lookup_by_name() {
        let table = ControllerTable::new(true, false);
        table.add_controller(rate_route("r1")).unwrap();

        assert!(table.lookup_by_name("").is_none());
        assert_eq!(table.lookup_by_name("r1").unwrap().name(), "r1");
        assert!(table.lookup_by_name("unknown").is_none());

        let table = ControllerTable::new(true, true);
        let ctrl = table.lookup_by_name("unknown").unwrap();
        assert_eq!(ctrl.kind(), ControllerKind::Default);
        assert_eq!(ctrl.name(), DEFAULT_CONTROLLER_NAME);
    }

    #[test]
    fn test_lookup_uri_default_matcher() {
        let table = ControllerTable::egress();
        table.add_controller(rate_route("r1")).unwrap();
        // The built-in matcher matches everything without naming a route.
        assert_eq!(table.lookup_uri("/any", "GET").kind(), ControllerKind::Default);
    }

    #[test]
    fn test_lookup_uri_resolution() {
        let table = ControllerTable::new(true, false);
        table.add_controller(rate_route("r1")).unwrap();
        table.set_uri_matcher(|uri: &str, _method: &str| match uri {
            "/r1" => Some("r1".to_string()),
            "/unknown" => Some("unknown".to_string()),
            "/bypass" => None,
            _ => Some(String::new()),
        });

        assert_eq!(table.lookup_uri("/r1", "GET").name(), "r1");
        // Unknown names fall back to the default even when lookup_by_name would not.
        assert_eq!(table.lookup_uri("/unknown", "GET").kind(), ControllerKind::Default);
        assert!(table.lookup_uri("/bypass", "GET").is_nil());
        assert_eq!(table.lookup_uri("/", "GET").kind(), ControllerKind::Default);
    }

    #[test]
    fn test_lookup_http_resolution() {
        let table = ControllerTable::egress();
        table.add_controller(rate_route("api")).unwrap();
        table.set_http_matcher(|req: &Request<Body>| {
            if req.uri().path().starts_with("/api") {
                Some("api".to_string())
            } else {
                None
            }
        });

        let req = Request::builder()
            .uri("http://example.com/api/v1")
            .body(Body::default())
            .unwrap();
        assert_eq!(table.lookup_http(&req).name(), "api");

        let req = Request::builder()
            .uri("http://example.com/health")
            .body(Body::default())
            .unwrap();
        assert!(table.lookup_http(&req).is_nil());
    }

    #[test]
    fn test_set_host_controller() {
        let table = ControllerTable::egress();
        let errs = table.set_host_controller(rate_route("h")).unwrap_err();
        assert_eq!(
            errs[0].to_string(),
            "invalid argument: host controller configuration is not valid for egress traffic"
        );

        let table = ControllerTable::ingress();
        let refused = [
            Route::named("h").with(TimeoutConfig::new(Duration::from_secs(1), 0)),
            Route::named("h").with(RetryConfig::new(vec![503], 1.0, 1, Duration::ZERO)),
            Route::named("h").with(FailoverConfig::with_invoke(|_: &str, _: bool| {})),
        ];
        for route in refused {
            let errs = table.set_host_controller(route).unwrap_err();
            assert_eq!(
                errs[0].to_string(),
                "invalid argument: host controller configuration does not allow retry, timeout, or failover controllers"
            );
            assert_eq!(table.host().capability_count(), 0);
        }

        let route = Route::named("h")
            .with(RateLimiterConfig::new(50.0, 5, 0))
            .with(ProxyConfig::new(true, "http://localhost:9090"));
        table.set_host_controller(route).unwrap();
        let host = table.host();
        assert_eq!(host.name(), HOST_CONTROLLER_NAME);
        assert_eq!(host.kind(), ControllerKind::Host);
        assert!(host.rate_limiter().is_some());
        assert!(host.proxy().is_some());
    }

    #[test]
    fn test_set_default_controller() {
        let table = ControllerTable::egress();
        table
            .set_default_controller(Route::named("").with(TimeoutConfig::new(Duration::from_secs(2), 0)))
            .unwrap();
        let ctrl = table.default_controller();
        assert_eq!(ctrl.name(), DEFAULT_CONTROLLER_NAME);
        assert_eq!(ctrl.timeout().unwrap().duration(), Duration::from_secs(2));

        let errs = table
            .set_default_controller(Route::named("").with(TimeoutConfig::new(Duration::ZERO, 0)))
            .unwrap_err();
        assert_eq!(errs.len(), 1);
        // Previous default survives a rejected replacement.
        assert_eq!(
            table.default_controller().timeout().unwrap().duration(),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_sentinel_setters_update_sentinel_slot() {
        let table = ControllerTable::egress();
        table
            .set_default_controller(Route::named("").with(RateLimiterConfig::new(10.0, 2, 0)))
            .unwrap();
        table.default_controller().rate_limiter().unwrap().set_limit(Limit::new(20.0));

        let ctrl = table.default_controller();
        assert_eq!(ctrl.rate_limiter().unwrap().limit_and_burst(), (Limit::new(20.0), 2));
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove() {
        let table = ControllerTable::egress();
        table.add_controller(rate_route("r1")).unwrap();
        table.add_controller(rate_route("r2")).unwrap();
        assert_eq!(table.names(), vec!["r1".to_string(), "r2".to_string()]);

        table.remove("r1");
        table.remove("");
        assert_eq!(table.count(), 1);
        assert!(!table.exists("r1"));
    }

    #[test]
    fn test_setter_after_remove_is_ignored() {
        let table = ControllerTable::egress();
        table.add_controller(rate_route("r1")).unwrap();
        let ctrl = table.lookup_by_name("r1").unwrap();
        table.remove("r1");

        ctrl.rate_limiter().unwrap().set_burst(20);
        assert!(table.is_empty());
        assert!(!table.shared.set_rate_limiter(ctrl.owner(), Limit::new(1.0), 1));
    }

    #[test]
    fn test_setter_reports_swap() {
        let table = ControllerTable::egress();
        table.add_controller(rate_route("r1")).unwrap();
        let ctrl = table.lookup_by_name("r1").unwrap();

        assert!(table.shared.set_rate_burst(ctrl.owner(), 20));
        // No proxy is configured on r1.
        assert!(!table.shared.set_proxy_enabled(ctrl.owner(), true));
        assert_eq!(table.lookup_by_name("r1").unwrap().rate_limiter().unwrap().limit_and_burst().1, 20);
    }

    #[test]
    fn test_debug() {
        let table = ControllerTable::new(false, true);
        table.add_controller(rate_route("r1")).unwrap();
        assert_eq!(
            format!("{table:?}"),
            "ControllerTable { egress: false, allow_default: true, count: 1 }"
        );
    }

    #[test]
    fn test_setter_after_table_dropped_is_ignored() {
        let table = ControllerTable::egress();
        table.add_controller(rate_route("r1")).unwrap();
        let ctrl = table.lookup_by_name("r1").unwrap();
        drop(table);

        ctrl.rate_limiter().unwrap().set_burst(20);
        assert_eq!(ctrl.rate_limiter().unwrap().limit_and_burst().1, 10);
    }
}
