use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Main library error type for everything outside a validation pass.
///
/// A field failing its rules is never an error: that outcome travels through
/// the boolean verdict and the rendered error block.
#[derive(Error, Debug)]
pub enum BevalidError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid selector '{selector}': {details}")]
    Selector { selector: String, details: String },

    #[error("Invalid error class '{class}': expected a single class name")]
    InvalidErrorClass { class: String },

    #[error("Container not found: no element matches '{selector}'")]
    ContainerNotFound { selector: String },

    #[error("Markup error: {path} - {details}")]
    Markup { path: PathBuf, details: String },

    #[error("Server error payload is malformed: {details}")]
    ServerPayload { details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Method {name} not found")]
    UnknownOperation { name: String },
}

impl From<ConfigError> for BevalidError {
    fn from(err: ConfigError) -> Self {
        BevalidError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for BevalidError {
    fn from(err: serde_json::Error) -> Self {
        BevalidError::ServerPayload {
            details: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, BevalidError>;
