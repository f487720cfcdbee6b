//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! policy file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PolicyFile (validated, immutable)
//!     → tables.rs (egress + ingress ControllerTable, matchers installed)
//! ```
//!
//! # Design Decisions
//! - The file only seeds the tables; runtime changes go through capability setters
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod tables;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{PolicyFile, RouteFile, TableFile};
pub use tables::build_tables;
pub use validation::validate_config;
