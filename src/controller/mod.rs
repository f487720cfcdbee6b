//! Controller subsystem.
//!
//! # Data Flow
//! ```text
//! Route (name, pattern, capability configs)
//!     → table.rs add_controller (validate, reject duplicates)
//!     → core.rs Controller (immutable, shared as Arc)
//!
//! Request or URI
//!     → installed matcher → route name / "" / unmatched
//!     → table.rs resolve → route, default or nil controller
//! ```
//!
//! # Design Decisions
//! - One table per traffic direction (egress, ingress)
//! - Readers never block on each other; writers swap whole controllers
//! - Host, default and nil controllers always exist

pub mod core;
pub mod route;
pub mod shared;
pub mod table;

pub use self::core::{Controller, ControllerKind};
pub use route::{PolicyConfig, Route};
pub use shared::Traffic;
pub use table::{ControllerTable, HttpMatcher, UriMatcher};
