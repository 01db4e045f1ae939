use thiserror::Error;

/// Core error types for fwports
///
/// The port reasoning itself never fails; these errors only come from the
/// seams around it (service database queries, configuration files, CLI input).
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Service database query failed
    #[error("service database error: {message}")]
    ServiceDatabase {
        message: String,
        exit_code: Option<i32>,
    },

    /// Input validation failed
    #[error("Validation error in {field}: {message}")]
    Validation { field: String, message: String },

    /// Configuration could not be used
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Represents a translated error with helpful context
#[derive(Debug, Clone)]
pub struct ErrorTranslation {
    pub user_message: String,
    pub suggestions: Vec<String>,
}

impl ErrorTranslation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            user_message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

impl Error {
    /// Returns a user-friendly translation of the error for CLI output.
    pub fn translate(&self) -> ErrorTranslation {
        match self {
            Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ErrorTranslation::new(format!("File not found: {e}"))
                    .with_suggestion("Check the services_file path in the configuration")
                    .with_suggestion("Run `fwports config show` to see the active settings")
            }
            Error::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorTranslation::new(format!("Permission denied: {e}"))
                    .with_suggestion("Ensure the file is readable by the current user")
            }
            Error::Io(e) => ErrorTranslation::new(format!("I/O error: {e}")),
            Error::Serialization(e) => ErrorTranslation::new(format!("Invalid JSON: {e}"))
                .with_suggestion("Fix or remove the configuration file to restore defaults"),
            Error::ServiceDatabase { message, exit_code } => {
                let translation =
                    ErrorTranslation::new(format!("Service database lookup failed: {message}"));
                match exit_code {
                    Some(127) | None => translation
                        .with_suggestion("Ensure getent is installed (glibc-utils / libc-bin)")
                        .with_suggestion("Or set FWPORTS_SERVICES=/etc/services to read the file directly"),
                    Some(_) => translation
                        .with_suggestion("Check /etc/nsswitch.conf for the services database")
                        .with_suggestion("Or set FWPORTS_SERVICES=none to use built-in aliases only"),
                }
            }
            Error::Validation { field, message } => {
                ErrorTranslation::new(format!("Invalid {field}: {message}"))
                    .with_suggestion("Port numbers must be between 1 and 65535")
                    .with_suggestion("Port ranges use a colon: 8000:8080")
            }
            Error::Config(message) => ErrorTranslation::new(format!("Configuration error: {message}"))
                .with_suggestion("Run `fwports config init` to write a fresh configuration"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
