//! Error types.

use thiserror::Error;

/// The main error type for Dawa client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-related error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Dawa API returned an error response.
    #[error("Dawa API error [{code}]: {message}")]
    Api { code: String, message: String },

    /// Operation requires authentication but none was provided.
    #[error("Authentication required")]
    AuthRequired,

    /// A required field was missing in the response.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Invalid argument passed to an API method.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Create a Dawa API error.
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a missing field error.
    pub fn missing(field: impl Into<String>) -> Self {
        Error::MissingField(field.into())
    }

    /// Check if this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Api { code, .. } => code == "429" || code.starts_with('5'),
            _ => false,
        }
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Error::AuthRequired => true,
            Error::Api { code, .. } => code == "401" || code == "403",
            _ => false,
        }
    }
}

/// Result type alias for Dawa client operations.
pub type Result<T> = std::result::Result<T, Error>;
