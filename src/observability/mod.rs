//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Controller table and policies produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters via the metrics facade)
//!     → state.rs (string-keyed policy state for access logging)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Whatever metrics recorder the embedding server installs
//!     → Access-log writer (external)
//! ```
//!
//! # Design Decisions
//! - The library never installs a recorder or subscriber on its own
//! - Metric updates are plain counter increments on the hot path
//! - State export uses fixed sentinels so log columns are always present

pub mod logging;
pub mod metrics;
pub mod state;
