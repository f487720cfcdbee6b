//! Names shared between the controller table and its consumers.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const EGRESS_TRAFFIC: &str = "egress";
pub const INGRESS_TRAFFIC: &str = "ingress";
pub const PING_TRAFFIC: &str = "ping";

/// Reserved name of the ingress host controller.
pub const HOST_CONTROLLER_NAME: &str = "host";
/// Name given to the default controller when the route does not set one.
pub const DEFAULT_CONTROLLER_NAME: &str = "default";
/// Name of the no-op controller returned for unmatched traffic.
pub const NIL_CONTROLLER_NAME: &str = "nil";

// Canonical keys of the exported policy state.
pub const CONTROLLER_NAME: &str = "name";
pub const TIMEOUT_NAME: &str = "timeout";
pub const FAILOVER_NAME: &str = "failover";
pub const RETRY_NAME: &str = "retry";
pub const RETRY_RATE_LIMIT_NAME: &str = "retryRateLimit";
pub const RETRY_RATE_BURST_NAME: &str = "retryBurst";
pub const RATE_LIMIT_NAME: &str = "rateLimit";
pub const RATE_BURST_NAME: &str = "burst";
pub const PROXY_NAME: &str = "proxy";

pub const REQUEST_ID_HEADER_NAME: &str = "X-REQUEST-ID";

/// Direction of the traffic a route applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Traffic {
    #[default]
    Egress,
    Ingress,
    Ping,
}

impl Traffic {
    pub fn as_str(self) -> &'static str {
        match self {
            Traffic::Egress => EGRESS_TRAFFIC,
            Traffic::Ingress => INGRESS_TRAFFIC,
            Traffic::Ping => PING_TRAFFIC,
        }
    }
}

impl fmt::Display for Traffic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
