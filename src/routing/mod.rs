//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route patterns (at startup):
//!     RouteFile[] (name, pattern) + bypass prefixes
//!     → matcher.rs RouteMatcher (sorted by specificity)
//!     → installed into a ControllerTable as its Http and Uri matcher
//!
//! Incoming request (host, path):
//!     → bypass prefix   → unmatched (nil controller)
//!     → matching rule   → route name
//!     → no rule         → "" (default controller)
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;

pub use matcher::{AndMatcher, HostMatcher, Matcher, PathPrefixMatcher, RouteMatcher};
