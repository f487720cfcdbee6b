//! Timeout policy.
//!
//! Holds the budget and the status to answer with when it is exceeded; enforcing it is
//! left to the request executor.

use std::fmt;
use std::time::Duration;

use crate::controller::core::Owner;
use crate::error::ControllerError;

pub const DEFAULT_TIMEOUT_STATUS: u16 = 504;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutConfig {
    pub duration: Duration,
    pub status_code: u16,
}

impl TimeoutConfig {
    /// A zero status code becomes 504.
    pub fn new(duration: Duration, status_code: u16) -> Self {
        Self {
            duration,
            status_code: if status_code == 0 {
                DEFAULT_TIMEOUT_STATUS
            } else {
                status_code
            },
        }
    }

    pub(crate) fn validate(&self) -> Vec<ControllerError> {
        if self.duration.is_zero() {
            return vec![ControllerError::config("Timeout duration is <= 0")];
        }
        Vec::new()
    }
}

pub struct Timeout {
    owner: Owner,
    config: TimeoutConfig,
}

impl Timeout {
    pub(crate) fn new(owner: Owner, config: TimeoutConfig) -> Self {
        Self { owner, config }
    }

    pub(crate) fn config(&self) -> &TimeoutConfig {
        &self.config
    }

    pub fn duration(&self) -> Duration {
        self.config.duration
    }

    pub fn status_code(&self) -> u16 {
        self.config.status_code
    }

    pub fn set_timeout(&self, duration: Duration) {
        if self.config.duration == duration || duration.is_zero() {
            return;
        }
        if let Some(table) = self.owner.table() {
            table.set_timeout(&self.owner, duration);
        }
    }
}

impl fmt::Debug for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeout")
            .field("name", &self.owner.name())
            .field("config", &self.config)
            .finish()
    }
}
