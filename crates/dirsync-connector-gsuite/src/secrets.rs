//! OAuth client secrets as downloaded from the Google Cloud console.

use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;

use crate::{GsuiteError, GsuiteResult};

/// Google's default authorization endpoint.
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google's default token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The client half of the installed-app OAuth flow.
#[derive(Debug, Clone)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: SecretString,
    pub auth_uri: String,
    pub token_uri: String,
}

#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<SecretsSection>,
    web: Option<SecretsSection>,
}

#[derive(Deserialize)]
struct SecretsSection {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    auth_uri: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

impl ClientSecrets {
    /// Parse a `credentials.json` document (`installed` or `web` section).
    ///
    /// # Errors
    ///
    /// Returns `GsuiteError::Secrets` if neither section is present or the
    /// client id is blank.
    pub fn from_json(json: &str) -> GsuiteResult<Self> {
        let file: SecretsFile = serde_json::from_str(json)
            .map_err(|e| GsuiteError::Secrets(format!("invalid client secrets: {e}")))?;
        let section = file.installed.or(file.web).ok_or_else(|| {
            GsuiteError::Secrets("expected an 'installed' or 'web' section".to_string())
        })?;

        if section.client_id.trim().is_empty() {
            return Err(GsuiteError::Secrets("client_id is empty".to_string()));
        }

        Ok(Self {
            client_id: section.client_id,
            client_secret: SecretString::from(section.client_secret),
            auth_uri: section
                .auth_uri
                .unwrap_or_else(|| DEFAULT_AUTH_URI.to_string()),
            token_uri: section
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }

    /// Read and parse a client secrets file.
    ///
    /// # Errors
    ///
    /// Returns `GsuiteError::Secrets` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> GsuiteResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            GsuiteError::Secrets(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Point both OAuth endpoints at another server.
    #[must_use]
    pub fn with_endpoints(mut self, auth_uri: impl Into<String>, token_uri: impl Into<String>) -> Self {
        self.auth_uri = auth_uri.into();
        self.token_uri = token_uri.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_parse_installed_section() {
        let json = r#"{
            "installed": {
                "client_id": "123.apps.googleusercontent.com",
                "project_id": "dirsync",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token",
                "client_secret": "shh",
                "redirect_uris": ["http://localhost"]
            }
        }"#;

        let secrets = ClientSecrets::from_json(json).unwrap();
        assert_eq!(secrets.client_id, "123.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret.expose_secret(), "shh");
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_parse_web_section_with_defaults() {
        let json = r#"{"web": {"client_id": "abc", "client_secret": "def"}}"#;
        let secrets = ClientSecrets::from_json(json).unwrap();
        assert_eq!(secrets.auth_uri, DEFAULT_AUTH_URI);
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_missing_section() {
        let error = ClientSecrets::from_json(r#"{"other": {}}"#).unwrap_err();
        assert!(matches!(error, GsuiteError::Secrets(_)));
    }

    #[test]
    fn test_missing_file() {
        let error = ClientSecrets::from_file(Path::new("/nonexistent/credentials.json")).unwrap_err();
        assert!(error.to_string().contains("/nonexistent/credentials.json"));
    }

    #[test]
    fn test_debug_hides_secret() {
        let secrets =
            ClientSecrets::from_json(r#"{"installed": {"client_id": "abc", "client_secret": "topsecret"}}"#)
                .unwrap();
        assert!(!format!("{secrets:?}").contains("topsecret"));
    }
}
