//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::PolicyFile;
use crate::config::validation::validate_config;
use crate::error::{join_errors, ControllerError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ControllerError>),
}

/// Load and validate a policy file.
pub fn load_config(path: &Path) -> Result<PolicyFile, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate policy file contents.
pub fn parse_config(content: &str) -> Result<PolicyFile, ConfigError> {
    let config: PolicyFile = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
