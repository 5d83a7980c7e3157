//! HTTP client for the MyAEGEE core API.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

use dirsync_core::RegistryMember;

use crate::{MyAegeeError, MyAegeeResult};

/// Default MyAEGEE deployment.
pub const DEFAULT_BASE_URL: &str = "https://my.aegee.eu";

/// Header carrying the access token.
const AUTH_HEADER: &str = "X-Auth-Token";

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyAegeeConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for MyAegeeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Login credentials. The password never appears in `Debug` output.
#[derive(Debug, Clone)]
pub struct MyAegeeCredentials {
    pub username: String,
    pub password: SecretString,
}

impl MyAegeeCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Response envelope shared by the core endpoints.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// MyAEGEE client with a cached session token.
#[derive(Debug)]
pub struct MyAegeeClient {
    http_client: reqwest::Client,
    base_url: Url,
    credentials: MyAegeeCredentials,
    access_token: Arc<RwLock<Option<SecretString>>>,
}

impl MyAegeeClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be created.
    pub fn new(config: &MyAegeeConfig, credentials: MyAegeeCredentials) -> MyAegeeResult<Self> {
        if credentials.username.trim().is_empty() {
            return Err(MyAegeeError::Config("username must not be empty".to_string()));
        }

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MyAegeeError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url,
            credentials,
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    fn endpoint(&self, path: &str) -> MyAegeeResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    /// Logs in and caches the access token.
    ///
    /// # Errors
    ///
    /// Returns `LoginRejected` when MyAEGEE refuses the credentials.
    #[instrument(skip(self), fields(username = %self.credentials.username))]
    pub async fn login(&self) -> MyAegeeResult<()> {
        let url = self.endpoint("/api/core/login")?;
        let body = LoginRequest {
            username: &self.credentials.username,
            password: self.credentials.password.expose_secret(),
        };

        let response = self.http_client.post(url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        let envelope: Envelope<serde_json::Value> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if status.is_server_error() => {
                return Err(MyAegeeError::Api {
                    status: status.as_u16(),
                    message: text,
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !envelope.success {
            let message = envelope
                .message
                .unwrap_or_else(|| format!("login failed with status {status}"));
            if status.is_server_error() {
                return Err(MyAegeeError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            return Err(MyAegeeError::LoginRejected(message));
        }

        let token = envelope
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MyAegeeError::LoginRejected("response carried no access token".to_string()))?;

        *self.access_token.write().await = Some(SecretString::from(token));
        info!("Logged in to MyAEGEE");
        Ok(())
    }

    async fn token(&self) -> MyAegeeResult<SecretString> {
        {
            let cache = self.access_token.read().await;
            if let Some(ref token) = *cache {
                return Ok(token.clone());
            }
        }
        self.login().await?;
        self.access_token
            .read()
            .await
            .clone()
            .ok_or_else(|| MyAegeeError::LoginRejected("no access token after login".to_string()))
    }

    /// Forgets the cached token, forcing a new login on next use.
    pub async fn invalidate(&self) {
        *self.access_token.write().await = None;
    }

    /// Lists every membership of a body.
    ///
    /// # Errors
    ///
    /// Returns an error if login fails, the token is refused twice, or the
    /// API reports `success: false`.
    #[instrument(skip(self))]
    pub async fn body_members(&self, body_id: i64) -> MyAegeeResult<Vec<RegistryMember>> {
        let path = format!("/api/core/bodies/{body_id}/members");
        let members: Vec<RegistryMember> = match self.get(&path).await {
            Err(MyAegeeError::Unauthorized(message)) => {
                warn!(%message, "Access token refused, logging in again");
                self.invalidate().await;
                self.get(&path).await?
            }
            other => other?,
        };

        debug!(body_id, count = members.len(), "Fetched body members");
        Ok(members)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> MyAegeeResult<T> {
        let token = self.token().await?;
        let url = self.endpoint(path)?;

        let response = self
            .http_client
            .get(url)
            .header(AUTH_HEADER, token.expose_secret())
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&text)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(text);
            return Err(MyAegeeError::Unauthorized(message));
        }

        let envelope: Envelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(MyAegeeError::Api {
                    status: status.as_u16(),
                    message: text,
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !envelope.success {
            return Err(MyAegeeError::Api {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            });
        }

        envelope.data.ok_or_else(|| MyAegeeError::Api {
            status: status.as_u16(),
            message: "response carried no data".to_string(),
        })
    }
}
