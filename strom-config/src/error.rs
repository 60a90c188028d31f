//! Error types for configuration loading and validation

use std::path::PathBuf;
use thiserror::Error;
use validator::ValidationErrors;

/// Unified configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid configuration:\n{}", format_validation_errors(.0))]
    Validation(#[source] ValidationErrors),

    #[error("Configuration parsing error: {0}")]
    Parsing(#[from] Box<figment::Error>),

    /// Cross-field check that the derive cannot express.
    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),
}

fn format_validation_errors(errors: &ValidationErrors) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    for (field, errors) in errors.errors() {
        let _ = writeln!(output, "Field '{}':", field);
        match errors {
            validator::ValidationErrorsKind::Field(errors) => {
                for error in errors {
                    let message = match &error.message {
                        Some(msg) => msg.to_string(),
                        None => error.code.to_string(),
                    };
                    let _ = writeln!(output, "  - {}", message);
                }
            }
            validator::ValidationErrorsKind::Struct(nested) => {
                let _ = write!(output, "{}", format_validation_errors(nested));
            }
            validator::ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    let _ = writeln!(output, "  [{}]", index);
                    let _ = write!(output, "{}", format_validation_errors(nested));
                }
            }
        }
    }
    output
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        ConfigError::Parsing(Box::new(error))
    }
}
