use thiserror::Error;
use wonderbook_core::{SourceError, WonderbookError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {url}: HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("not signed in or session expired ({0})")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limit from {0}, retry after {1}s")]
    RateLimit(String, u64),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("session error: {0}")]
    Session(String),

    #[error(transparent)]
    Core(#[from] WonderbookError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ApiError> for SourceError {
    fn from(err: ApiError) -> Self {
        SourceError::new("wonderbook api", err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
