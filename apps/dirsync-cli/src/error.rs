//! CLI error types and exit codes

use thiserror::Error;

use dirsync_connector_gsuite::GsuiteError;
use dirsync_connector_myaegee::MyAegeeError;
use dirsync_core::ReconcileError;

/// Exit codes for the CLI
/// - 0: Success (with or without discrepancies)
/// - 1: Data or configuration error
/// - 2: Authentication error
/// - 3: Network error
/// - 5: Server error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Data(#[from] ReconcileError),

    #[error("MyAEGEE login failed: {0}")]
    RegistryAuth(String),

    #[error("Google Workspace authorization failed: {0}")]
    DirectoryAuth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Data(_) => 1,
            CliError::RegistryAuth(_) | CliError::DirectoryAuth(_) => 2,
            CliError::Network(_) | CliError::ConnectionFailed(_) => 3,
            CliError::Server(_) => 5,
            CliError::Api { status, .. } => {
                if *status >= 500 {
                    5
                } else if *status == 401 || *status == 403 {
                    2
                } else {
                    1
                }
            }
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let CliError::Data(e) = self {
            for record in e.records() {
                eprintln!("  {}", record.describe());
            }
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::RegistryAuth(_) => {
                Some("Check --myaegee-user and --myaegee-pass (or MYAEGEE_USER / MYAEGEE_PASS).")
            }
            CliError::DirectoryAuth(_) => Some(
                "Delete the token file to authorize again, and make sure the account is a Workspace admin.",
            ),
            CliError::ConnectionFailed(_) => Some("Check your network connection and try again."),
            CliError::Data(ReconcileError::DuplicateKey { .. }) => {
                Some("Two records share one email address. Fix the source data and run again.")
            }
            _ => None,
        }
    }
}

fn network_error(e: &reqwest::Error) -> CliError {
    if e.is_connect() {
        CliError::ConnectionFailed(e.to_string())
    } else if e.is_timeout() {
        CliError::Network("Request timed out".to_string())
    } else {
        CliError::Network(e.to_string())
    }
}

impl From<MyAegeeError> for CliError {
    fn from(e: MyAegeeError) -> Self {
        match e {
            MyAegeeError::Http(ref inner) if e.is_network() => network_error(inner),
            MyAegeeError::LoginRejected(_) | MyAegeeError::Unauthorized(_) => {
                CliError::RegistryAuth(e.to_string())
            }
            MyAegeeError::Config(message) => CliError::Config(message),
            MyAegeeError::Api { status, message } => CliError::Api {
                status,
                message: format!("MyAEGEE: {message}"),
            },
            other => CliError::Server(format!("MyAEGEE: {other}")),
        }
    }
}

impl From<GsuiteError> for CliError {
    fn from(e: GsuiteError) -> Self {
        match e {
            GsuiteError::Http(ref inner) if e.is_network() => network_error(inner),
            GsuiteError::Config(_) | GsuiteError::Secrets(_) | GsuiteError::TokenStore(_) => {
                CliError::Config(e.to_string())
            }
            ref auth if auth.is_auth() => CliError::DirectoryAuth(e.to_string()),
            GsuiteError::Api { status, reason, message } => CliError::Api {
                status,
                message: format!("Google Workspace: {reason} - {message}"),
            },
            GsuiteError::Io(inner) => CliError::Config(format!("I/O error: {inner}")),
            other => CliError::Server(format!("Google Workspace: {other}")),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Config(format!("I/O error: {}", e))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Config(format!("JSON error: {}", e))
    }
}
