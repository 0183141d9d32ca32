//! Result and error types for Droidprobe.

use thiserror::Error;

/// Result type for Droidprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving a device
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Device (or its automation bridge) did not answer
    #[error("Device unreachable: {message}")]
    DeviceUnreachable {
        /// Error message
        message: String,
    },

    /// Automation surface rejected or failed an action
    #[error("Automation failed during {action}: {message}")]
    Automation {
        /// Action that was attempted
        action: String,
        /// Error message
        message: String,
    },

    /// Element handle no longer resolves to an on-screen element
    #[error("Element not found: {query}")]
    ElementNotFound {
        /// Query that produced the handle
        query: String,
    },

    /// Expected state was not observed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Foreground package differs from the configured target
    #[error("Identity mismatch: expected package '{expected}', found '{actual}'")]
    IdentityMismatch {
        /// Configured package identifier
        expected: String,
        /// Package currently owning the display
        actual: String,
    },

    /// Invalid state error (operation called in wrong state)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create a device-unreachable error
    #[must_use]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::DeviceUnreachable {
            message: message.into(),
        }
    }

    /// Create an automation error for the given action
    #[must_use]
    pub fn automation(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Automation {
            action: action.into(),
            message: message.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error is an assertion-class failure.
    ///
    /// Assertion-class errors end a scenario as `Failed`; everything else
    /// is an environment error and ends it as `Errored`.
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(
            self,
            Self::AssertionFailed { .. } | Self::IdentityMismatch { .. }
        )
    }
}
