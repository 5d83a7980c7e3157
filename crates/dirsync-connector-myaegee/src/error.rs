//! Error types for the MyAEGEE connector.

use thiserror::Error;

/// Result type alias using `MyAegeeError`.
pub type MyAegeeResult<T> = Result<T, MyAegeeError>;

/// Errors that can occur when talking to MyAEGEE.
#[derive(Debug, Error)]
pub enum MyAegeeError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The login endpoint refused the credentials.
    #[error("Login error: {0}")]
    LoginRejected(String),

    /// The access token was refused.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The API answered with `success: false` or an unexpected status.
    #[error("MyAEGEE API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl MyAegeeError {
    /// Credentials or token were refused.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::LoginRejected(_) | Self::Unauthorized(_))
    }

    /// The failure happened on the MyAEGEE side.
    #[must_use]
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status >= 500)
    }

    /// The request never got a response.
    #[must_use]
    pub fn is_network(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}
