//! Error types for the rain overlay.

use thiserror::Error;

/// Result type alias using RainError.
pub type RainResult<T> = Result<T, RainError>;

/// Primary error type for overlay configuration and data refresh.
#[derive(Debug, Error)]
pub enum RainError {
    // === Configuration Errors ===
    #[error("Unknown source preset: {0}")]
    UnknownSource(String),

    #[error("Unknown scale preset: {0}")]
    UnknownScale(String),

    #[error("Invalid scale '{name}': {message}")]
    InvalidScale { name: String, message: String },

    #[error("Invalid source '{name}': {message}")]
    InvalidSource { name: String, message: String },

    #[error("Invalid layer options: {0}")]
    InvalidOptions(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    // === Catalog Errors ===
    #[error("Catalog request failed: {0}")]
    Catalog(String),

    #[error("Catalog has no value for template field '{0}'")]
    TemplateField(String),

    // === Host Errors ===
    #[error("Host rejected operation: {0}")]
    Host(String),

    #[error("GPU operation failed: {0}")]
    Gpu(String),

    #[error("Layer is not attached to a map")]
    NotAttached,

    // === Infrastructure Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RainError {
    /// True for errors that make the layer unable to initialize.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RainError::UnknownSource(_)
                | RainError::UnknownScale(_)
                | RainError::InvalidScale { .. }
                | RainError::InvalidSource { .. }
                | RainError::InvalidOptions(_)
                | RainError::InvalidColor(_)
                | RainError::ConfigParse(_)
        )
    }
}

// Conversion from common error types
impl From<std::io::Error> for RainError {
    fn from(err: std::io::Error) -> Self {
        RainError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for RainError {
    fn from(err: serde_json::Error) -> Self {
        RainError::ConfigParse(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for RainError {
    fn from(err: serde_yaml::Error) -> Self {
        RainError::ConfigParse(format!("YAML error: {}", err))
    }
}
