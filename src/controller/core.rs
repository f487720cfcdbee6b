//! The per-route controller aggregate.
//!
//! A controller owns zero or one instance of each capability. Once published into a
//! table it is never mutated: every change builds a new controller with exactly one
//! capability replaced, sharing all other fields by reference.

use std::fmt;
use std::sync::Arc;

use crate::controller::route::Route;
use crate::controller::table::{TableRef, TableShared};
use crate::error::Result;
use crate::policy::{Failover, Proxy, RateLimiter, Retry, Timeout};

/// Which slot of its table a controller lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerKind {
    /// Registered under its route name.
    Route,
    /// Ingress host singleton.
    Host,
    /// Fallback singleton.
    Default,
    /// No-op singleton: the caller must bypass all policy.
    Nil,
}

/// Identity of the controller a capability belongs to, plus a non-owning
/// reference to the table that publishes it.
#[derive(Debug, Clone)]
pub(crate) struct Owner {
    name: Arc<str>,
    kind: ControllerKind,
    table: TableRef,
}

impl Owner {
    pub(crate) fn new(name: &str, kind: ControllerKind, table: TableRef) -> Self {
        Self {
            name: Arc::from(name),
            kind,
            table,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn kind(&self) -> ControllerKind {
        self.kind
    }

    /// The owning table, if it is still alive.
    pub(crate) fn table(&self) -> Option<Arc<TableShared>> {
        let table = self.table.upgrade();
        if table.is_none() {
            tracing::debug!(route = %self.name, "Owning table dropped, update ignored");
        }
        table
    }
}

/// A capability that can be swapped into a controller.
pub(crate) trait Capability {
    fn install(self, ctrl: &mut Controller);
}

/// The per-route aggregate of traffic policies.
#[derive(Clone)]
pub struct Controller {
    owner: Owner,
    timeout: Option<Arc<Timeout>>,
    rate_limiter: Option<Arc<RateLimiter>>,
    retry: Option<Arc<Retry>>,
    failover: Option<Arc<Failover>>,
    proxy: Option<Arc<Proxy>>,
}

impl Controller {
    /// Validate every capability config of `route` and build the controller.
    ///
    /// All validation errors are returned together; only supplied configs produce a
    /// capability.
    pub(crate) fn build(route: &Route, kind: ControllerKind, table: TableRef) -> Result<Self> {
        route.validate()?;
        let owner = Owner::new(&route.name, kind, table);
        Ok(Self {
            timeout: route
                .timeout
                .as_ref()
                .map(|c| Arc::new(Timeout::new(owner.clone(), c.clone()))),
            rate_limiter: route
                .rate_limiter
                .as_ref()
                .map(|c| Arc::new(RateLimiter::new(owner.clone(), *c))),
            retry: route
                .retry
                .as_ref()
                .map(|c| Arc::new(Retry::new(owner.clone(), c.clone()))),
            failover: route
                .failover
                .as_ref()
                .and_then(|c| Failover::new(owner.clone(), c.clone()))
                .map(Arc::new),
            proxy: route
                .proxy
                .as_ref()
                .map(|c| Arc::new(Proxy::new(owner.clone(), c.clone()))),
            owner,
        })
    }

    /// A controller with no capabilities.
    pub(crate) fn sentinel(name: &str, kind: ControllerKind, table: TableRef) -> Self {
        Self {
            owner: Owner::new(name, kind, table),
            timeout: None,
            rate_limiter: None,
            retry: None,
            failover: None,
            proxy: None,
        }
    }

    /// Shallow copy with exactly one capability replaced.
    pub(crate) fn with_capability<C: Capability>(&self, capability: C) -> Controller {
        let mut next = self.clone();
        capability.install(&mut next);
        next
    }

    pub(crate) fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn name(&self) -> &str {
        self.owner.name()
    }

    pub fn kind(&self) -> ControllerKind {
        self.owner.kind()
    }

    /// True for the no-op controller: no policy applies.
    pub fn is_nil(&self) -> bool {
        self.kind() == ControllerKind::Nil
    }

    pub fn timeout(&self) -> Option<&Timeout> {
        self.timeout.as_deref()
    }

    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.rate_limiter.as_deref()
    }

    pub fn retry(&self) -> Option<&Retry> {
        self.retry.as_deref()
    }

    pub fn failover(&self) -> Option<&Failover> {
        self.failover.as_deref()
    }

    pub fn proxy(&self) -> Option<&Proxy> {
        self.proxy.as_deref()
    }

    /// Number of configured capabilities.
    pub fn capability_count(&self) -> usize {
        [
            self.timeout.is_some(),
            self.rate_limiter.is_some(),
            self.retry.is_some(),
            self.failover.is_some(),
            self.proxy.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("timeout", &self.timeout)
            .field("rate_limiter", &self.rate_limiter)
            .field("retry", &self.retry)
            .field("failover", &self.failover)
            .field("proxy", &self.proxy)
            .finish()
    }
}

impl Capability for Timeout {
    fn install(self, ctrl: &mut Controller) {
        ctrl.timeout = Some(Arc::new(self));
    }
}

impl Capability for RateLimiter {
    fn install(self, ctrl: &mut Controller) {
        ctrl.rate_limiter = Some(Arc::new(self));
    }
}

impl Capability for Retry {
    fn install(self, ctrl: &mut Controller) {
        ctrl.retry = Some(Arc::new(self));
    }
}

impl Capability for Failover {
    fn install(self, ctrl: &mut Controller) {
        ctrl.failover = Some(Arc::new(self));
    }
}

impl Capability for Proxy {
    fn install(self, ctrl: &mut Controller) {
        ctrl.proxy = Some(Arc::new(self));
    }
}
