//! Error types shared by controller construction and table registration.

use thiserror::Error;

/// Errors produced while validating policy configuration or registering controllers.
///
/// Registration never stops at the first problem: callers receive every error found
/// across all configured capabilities as a `Vec<ControllerError>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// A capability's own field invariant failed.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Caller misuse, e.g. an empty or duplicate route name.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ControllerError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Same error, message prefixed with where it was found.
    pub(crate) fn within(self, context: &str) -> Self {
        match self {
            Self::InvalidConfiguration(msg) => Self::InvalidConfiguration(format!("{context}: {msg}")),
            Self::InvalidArgument(msg) => Self::InvalidArgument(format!("{context}: {msg}")),
        }
    }
}

/// Result of an accumulate-all validation or registration.
pub type Result<T> = std::result::Result<T, Vec<ControllerError>>;

/// Join a list of errors into one line, for logging and display.
pub fn join_errors(errors: &[ControllerError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
