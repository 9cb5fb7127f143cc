//! Error types for Meld

use thiserror::Error;

/// The main error type for Meld operations
#[derive(Debug, Error)]
pub enum MeldError {
    /// A shader program failed to parse, validate, or link
    #[error("Compile error: {0}")]
    CompileError(String),

    /// Mesh assembly found an internal inconsistency
    #[error("Build error: {0}")]
    BuildError(String),

    /// The compute or render device is unavailable
    #[error("Resource error: {0}")]
    ResourceError(String),

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Value out of range: {field} must be between {min} and {max}, got {value}")]
    ValueOutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("Invalid enum value: {value} is not one of {allowed:?}")]
    InvalidEnumValue {
        value: String,
        allowed: Vec<String>,
    },
}

/// Result type alias for Meld operations
pub type Result<T> = std::result::Result<T, MeldError>;

impl MeldError {
    /// Errors that leave the previous mesh in place instead of aborting the run
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MeldError::ResourceError(_))
    }
}

impl From<toml::de::Error> for MeldError {
    fn from(err: toml::de::Error) -> Self {
        MeldError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for MeldError {
    fn from(err: toml::ser::Error) -> Self {
        MeldError::TomlSerError(err.to_string())
    }
}
