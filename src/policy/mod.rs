//! Per-route traffic policies.
//!
//! # Data Flow
//! ```text
//! Route config (TimeoutConfig, RateLimiterConfig, ...)
//!     → validate (all errors collected)
//!     → capability instance owned by one Controller
//!
//! Runtime change (set_limit, enable, set_pattern, ...)
//!     → owning table builds a successor controller
//!     → successor published under the table's write lock
//! ```
//!
//! # Design Decisions
//! - Capabilities are immutable once published; setters never mutate in place
//! - Setters on a capability whose table is gone are ignored
//! - A limit of [`Limit::UNLIMITED`] admits everything without touching a bucket

pub mod failover;
pub mod proxy;
pub mod rate_limit;
pub mod retry;
pub mod timeout;
pub mod token_bucket;

pub use failover::{Failover, FailoverConfig, FailureInvoke};
pub use proxy::{Proxy, ProxyConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig, DEFAULT_RATE_LIMITED_STATUS};
pub use retry::{Retry, RetryConfig, NOT_ELIGIBLE_FLAG, RATE_LIMITED_FLAG};
pub use timeout::{Timeout, TimeoutConfig, DEFAULT_TIMEOUT_STATUS};
pub use token_bucket::{normalize, Limit, DEFAULT_BURST};
