//! Error types for the Google Workspace connector.

use thiserror::Error;

/// Result type alias using `GsuiteError`.
pub type GsuiteResult<T> = Result<T, GsuiteError>;

/// Errors that can occur when talking to Google Workspace.
#[derive(Debug, Error)]
pub enum GsuiteError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The OAuth client secrets file is missing or unreadable.
    #[error("Client secrets error: {0}")]
    Secrets(String),

    /// `OAuth2` authorization or token exchange failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Token refresh failed.
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    /// The token cache file could not be read or written.
    #[error("Token store error: {0}")]
    TokenStore(String),

    /// Admin SDK API error.
    #[error("Directory API error: {status} {reason} - {message}")]
    Api {
        status: u16,
        reason: String,
        message: String,
    },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Maximum retry attempts exceeded.
    #[error("Maximum retries ({attempts}) exceeded")]
    MaxRetriesExceeded { attempts: u32 },
}

impl GsuiteError {
    /// Authorization failed or the token was refused.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Auth(_) | Self::TokenRefresh(_) => true,
            Self::Api { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    /// The failure happened on Google's side.
    #[must_use]
    pub fn is_server(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status >= 500,
            Self::MaxRetriesExceeded { .. } => true,
            _ => false,
        }
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
