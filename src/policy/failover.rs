//! Failover policy: a callback the executor runs when the primary path fails.

use std::fmt;
use std::sync::Arc;

use crate::controller::core::Owner;
use crate::error::ControllerError;

/// Invoked with the route name and whether failover is currently enabled.
pub type FailureInvoke = Arc<dyn Fn(&str, bool) + Send + Sync>;

#[derive(Clone)]
pub struct FailoverConfig {
    pub invoke: Option<FailureInvoke>,
    pub enabled: bool,
}

impl FailoverConfig {
    pub fn new(invoke: Option<FailureInvoke>) -> Self {
        Self {
            invoke,
            enabled: true,
        }
    }

    /// Enabled failover running `invoke`.
    pub fn with_invoke<F>(invoke: F) -> Self
    where
        F: Fn(&str, bool) + Send + Sync + 'static,
    {
        Self::new(Some(Arc::new(invoke)))
    }

    pub(crate) fn validate(&self) -> Vec<ControllerError> {
        if self.invoke.is_none() {
            return vec![ControllerError::config("Failover FailureInvoke function is nil")];
        }
        Vec::new()
    }
}

impl fmt::Debug for FailoverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailoverConfig")
            .field("invoke", &self.invoke.as_ref().map(|_| "fn"))
            .field("enabled", &self.enabled)
            .finish()
    }
}

pub struct Failover {
    owner: Owner,
    invoke: FailureInvoke,
    enabled: bool,
}

impl Failover {
    /// `None` when the config carries no callback.
    pub(crate) fn new(owner: Owner, config: FailoverConfig) -> Option<Self> {
        Some(Self {
            owner,
            invoke: config.invoke?,
            enabled: config.enabled,
        })
    }

    pub(crate) fn with_enabled(&self, enabled: bool) -> Failover {
        Failover {
            owner: self.owner.clone(),
            invoke: self.invoke.clone(),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&self) {
        if self.enabled {
            return;
        }
        if let Some(table) = self.owner.table() {
            table.set_failover_enabled(&self.owner, true);
        }
    }

    pub fn disable(&self) {
        if !self.enabled {
            return;
        }
        if let Some(table) = self.owner.table() {
            table.set_failover_enabled(&self.owner, false);
        }
    }

    /// Run the failover callback for this route.
    pub fn invoke(&self) {
        tracing::debug!(route = %self.owner.name(), enabled = self.enabled, "Failover invoked");
        (self.invoke)(self.owner.name(), self.enabled);
    }
}

impl fmt::Debug for Failover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failover")
            .field("name", &self.owner.name())
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ControllerTable, Route};
    use std::sync::Mutex;

    #[test]
    fn test_invoke() {
        let calls: Arc<Mutex<Vec<(String, bool)>>> = Arc::default();
        let recorded = calls.clone();
        let table = ControllerTable::egress();
        table
            .add_controller(Route::named("r1").with(FailoverConfig::with_invoke(
                move |name: &str, enabled: bool| {
                    recorded.lock().unwrap().push((name.to_string(), enabled));
                },
            )))
            .unwrap();

        let ctrl = table.lookup_by_name("r1").unwrap();
        ctrl.failover().unwrap().invoke();
        assert_eq!(*calls.lock().unwrap(), vec![("r1".to_string(), true)]);
    }

    #[test]
    fn test_enable_disable() {
        let table = ControllerTable::egress();
        table
            .add_controller(Route::named("r1").with(FailoverConfig::with_invoke(|_: &str, _: bool| {})))
            .unwrap();

        let before = table.lookup_by_name("r1").unwrap();
        assert!(before.failover().unwrap().is_enabled());

        before.failover().unwrap().disable();
        let after = table.lookup_by_name("r1").unwrap();
        assert!(!after.failover().unwrap().is_enabled());
        assert!(before.failover().unwrap().is_enabled());

        after.failover().unwrap().enable();
        assert!(table.lookup_by_name("r1").unwrap().failover().unwrap().is_enabled());
    }
}
