//! Error types for moonmint core

use thiserror::Error;

/// Result type for moonmint core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// No template with this id exists in the source
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// A parameter is out of range or names an unknown variant
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A catalog entry failed validation
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// I/O error while reading a template source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Template file is not valid TOML for a template record
    #[error("Template format error: {0}")]
    TemplateFormat(#[from] toml::de::Error),
}

impl CoreError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
