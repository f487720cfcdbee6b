//! Route Policy Library
//!
//! Per-route traffic policy for an HTTP gateway: controller tables, token-bucket rate
//! limiting, retry eligibility, timeout and failover holders, and proxy URL rewriting.

// Core
pub mod controller;
pub mod error;
pub mod policy;

// Glue
pub mod config;
pub mod routing;

// Cross-cutting concerns
pub mod observability;

pub use controller::{Controller, ControllerKind, ControllerTable, Route, Traffic};
pub use error::ControllerError;
