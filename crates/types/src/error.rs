//! Error types for the image manager

use thiserror::Error;

/// Main error type for the image manager
#[derive(Error, Debug)]
pub enum ImageManagerError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Advisory findings treated as fatal (strict checking)
    #[error("Configuration has {warnings} advisory warning(s) in strict mode")]
    StrictValidation { warnings: usize },
}

/// Result type alias for image manager operations
pub type Result<T> = std::result::Result<T, ImageManagerError>;

/// Configuration specific errors
///
/// The first four variants describe a document that was read but rejected.
/// The rest belong to acquiring the document in the first place.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Top-level document is not an object
    #[error("Configuration document must be an object, got {actual}")]
    MalformedDocument { actual: String },

    /// Required key absent from the document
    #[error("Missing required configuration field: {field}")]
    MissingRequiredField { field: String },

    /// Present value has the wrong type
    #[error("Invalid type for {field}: expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// Correctly typed value breaks a declared constraint
    #[error("Constraint violated for {field}: expected {constraint}, got {actual}")]
    ConstraintViolation {
        field: String,
        constraint: String,
        actual: String,
    },

    /// File not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// File extension not understood
    #[error("Unsupported configuration format: {extension}")]
    UnsupportedFormat { extension: String },

    /// Parse error
    #[error("Configuration parse error: {0}")]
    Parse(String),

    /// IO error
    #[error("IO error reading configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Name of the offending field, when the error is about one
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::MissingRequiredField { field }
            | ConfigError::TypeMismatch { field, .. }
            | ConfigError::ConstraintViolation { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_accessor() {
        let err = ConfigError::MissingRequiredField {
            field: "WorkerThreads".to_string(),
        };
        assert_eq!(err.field(), Some("WorkerThreads"));

        let err = ConfigError::Parse("bad".to_string());
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_display_carries_diagnostics() {
        let err = ConfigError::ConstraintViolation {
            field: "WorkerThreads".to_string(),
            constraint: ">= 1".to_string(),
            actual: "0".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("WorkerThreads"));
        assert!(message.contains(">= 1"));
        assert!(message.contains("got 0"));
    }

    #[test]
    fn test_wraps_into_top_level_error() {
        let err: ImageManagerError = ConfigError::MalformedDocument {
            actual: "array".to_string(),
        }
        .into();
        assert!(matches!(err, ImageManagerError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error:"));
    }
}
