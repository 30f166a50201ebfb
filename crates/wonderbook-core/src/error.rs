use thiserror::Error;

/// All errors that can occur in wonderbook-core.
#[derive(Debug, Error)]
pub enum WonderbookError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Failure reported by a [`crate::list::ListSource`].
///
/// Sources live in other crates (HTTP, fixtures), so the cause is carried as
/// text; the list controller only needs something to log and show.
#[derive(Debug, Clone, Error)]
#[error("{context}: {message}")]
pub struct SourceError {
    pub context: String,
    pub message: String,
}

impl SourceError {
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Exit codes used by the CLI.
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    NetworkError = 6,
    ConfirmRequired = 8,
}

pub type Result<T> = std::result::Result<T, WonderbookError>;
