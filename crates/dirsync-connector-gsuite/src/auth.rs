//! OAuth2 authentication for the Admin SDK.
//!
//! Tokens come from, in order: the in-memory cache, the on-disk
//! [`TokenStore`], a refresh-token grant, and finally an interactive
//! authorization through an [`Authorizer`] (normally [`LoopbackFlow`]).

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use chrono::Duration;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::store::{StoredToken, TokenStore};
use crate::{ClientSecrets, GsuiteError, GsuiteResult};

/// Read-only scope for directory users.
pub const SCOPE_USER_READONLY: &str =
    "https://www.googleapis.com/auth/admin.directory.user.readonly";

/// Read-only scope for group memberships.
pub const SCOPE_GROUP_MEMBER_READONLY: &str =
    "https://www.googleapis.com/auth/admin.directory.group.member.readonly";

/// Scopes needed to list users and group members.
pub const DIRECTORY_SCOPES: [&str; 2] = [SCOPE_USER_READONLY, SCOPE_GROUP_MEMBER_READONLY];

/// How long the callback server may take to flush its last response.
const SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_secs(2);

/// An authorization code together with the redirect URI it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    pub redirect_uri: String,
}

/// Obtains an authorization code from the resource owner.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(
        &self,
        secrets: &ClientSecrets,
        scopes: &[String],
    ) -> GsuiteResult<AuthorizationCode>;
}

/// Installed-app flow: a short-lived HTTP server on the loopback interface
/// receives the redirect from Google's consent page.
#[derive(Debug, Clone)]
pub struct LoopbackFlow {
    timeout: std::time::Duration,
    open_browser: bool,
}

impl Default for LoopbackFlow {
    fn default() -> Self {
        Self {
            timeout: std::time::Duration::from_secs(300),
            open_browser: true,
        }
    }
}

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Default, Deserialize)]
struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl RedirectParams {
    /// `None` for requests that carry neither a code nor an error.
    fn outcome(self, expected_state: &str) -> Option<GsuiteResult<String>> {
        if let Some(error) = self.error {
            return Some(Err(GsuiteError::Auth(format!("authorization denied: {error}"))));
        }
        let code = self.code?;
        if self.state.as_deref() != Some(expected_state) {
            return Some(Err(GsuiteError::Auth(
                "authorization response state does not match".to_string(),
            )));
        }
        Some(Ok(code))
    }
}

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<str>,
    sender: Arc<Mutex<Option<oneshot::Sender<GsuiteResult<String>>>>>,
}

async fn handle_redirect(
    State(state): State<CallbackState>,
    Query(params): Query<RedirectParams>,
) -> &'static str {
    let Some(outcome) = params.outcome(&state.expected_state) else {
        return "Waiting for authorization.";
    };
    let body = match &outcome {
        Ok(_) => "Authorization complete. You may close this window.",
        Err(_) => "Authorization failed. Check the terminal for details.",
    };
    if let Some(sender) = state.sender.lock().await.take() {
        let _ = sender.send(outcome);
    }
    body
}

impl LoopbackFlow {
    #[must_use]
    pub fn with_timeout(timeout: std::time::Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Print the consent URL instead of launching a browser.
    #[must_use]
    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    /// Consent page URL for the given redirect and state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured authorization endpoint is not a URL.
    pub fn consent_url(
        secrets: &ClientSecrets,
        scopes: &[String],
        redirect_uri: &str,
        state: &str,
    ) -> GsuiteResult<Url> {
        Ok(Url::parse_with_params(
            &secrets.auth_uri,
            &[
                ("client_id", secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scopes.join(" ").as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )?)
    }

    /// Serve `/` on `listener` until a redirect carrying a code or an error
    /// arrives, or `timeout` elapses.
    async fn receive_code(
        listener: TcpListener,
        expected_state: &str,
        timeout: std::time::Duration,
    ) -> GsuiteResult<String> {
        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new()
            .route("/", get(handle_redirect))
            .with_state(CallbackState {
                expected_state: Arc::from(expected_state),
                sender: Arc::new(Mutex::new(Some(code_tx))),
            });

        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let outcome = tokio::time::timeout(timeout, code_rx).await;

        let _ = shutdown_tx.send(());
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
            server.abort();
        }

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(GsuiteError::Auth(
                "authorization listener stopped unexpectedly".to_string(),
            )),
            Err(_) => Err(GsuiteError::Auth(format!(
                "no authorization received within {} seconds",
                timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl Authorizer for LoopbackFlow {
    #[instrument(skip_all)]
    async fn authorize(
        &self,
        secrets: &ClientSecrets,
        scopes: &[String],
    ) -> GsuiteResult<AuthorizationCode> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{port}");
        let state = uuid::Uuid::new_v4().to_string();

        let url = Self::consent_url(secrets, scopes, &redirect_uri, &state)?;
        if self.open_browser && open::that(url.as_str()).is_ok() {
            eprintln!("\nOpened the Google consent page in your browser.");
        } else {
            eprintln!("\nPlease open this URL in your browser to authorize directory access:");
            eprintln!("  {url}");
        }
        eprintln!("\nWaiting for the redirect on {redirect_uri} ...");

        let code = Self::receive_code(listener, &state, self.timeout).await?;

        debug!("Received authorization code");
        Ok(AuthorizationCode { code, redirect_uri })
    }
}

/// OAuth2 token response from Google.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// OAuth2 error response.
#[derive(Debug, Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuthError {
    fn describe(&self) -> String {
        match &self.error_description {
            Some(description) => format!("{}: {description}", self.error),
            None => self.error.clone(),
        }
    }
}

/// Token cache for Admin SDK access tokens.
pub struct TokenCache {
    secrets: ClientSecrets,
    scopes: Vec<String>,
    store: Option<TokenStore>,
    authorizer: Arc<dyn Authorizer>,
    http_client: reqwest::Client,
    cached_token: Arc<RwLock<Option<StoredToken>>>,
    /// Grace period before expiry to trigger refresh (default: 5 minutes).
    grace_period: Duration,
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("client_id", &self.secrets.client_id)
            .field("scopes", &self.scopes)
            .field("store", &self.store)
            .field("grace_period", &self.grace_period)
            .finish_non_exhaustive()
    }
}

impl TokenCache {
    /// Creates a token cache using the loopback flow and [`DIRECTORY_SCOPES`].
    pub fn new(secrets: ClientSecrets, store: Option<TokenStore>) -> Self {
        Self::with_authorizer(secrets, store, Arc::new(LoopbackFlow::default()))
    }

    pub fn with_authorizer(
        secrets: ClientSecrets,
        store: Option<TokenStore>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            secrets,
            scopes: DIRECTORY_SCOPES.iter().map(|s| (*s).to_string()).collect(),
            store,
            authorizer,
            http_client: reqwest::Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
            grace_period: Duration::minutes(5),
        }
    }

    /// Gets a valid access token, refreshing or authorizing if necessary.
    #[instrument(skip(self))]
    pub async fn get_token(&self) -> GsuiteResult<String> {
        {
            let cache = self.cached_token.read().await;
            if let Some(ref token) = *cache {
                if !token.is_expired(self.grace_period) {
                    debug!("Using cached token");
                    return Ok(token.access_token.clone());
                }
            }
        }

        let mut cache = self.cached_token.write().await;
        if let Some(ref token) = *cache {
            if !token.is_expired(self.grace_period) {
                return Ok(token.access_token.clone());
            }
        }

        let current = match cache.take() {
            Some(token) => Some(token),
            None => self.load_stored()?,
        };

        let token = match current {
            Some(token) if !token.is_expired(self.grace_period) => token,
            Some(token) => match token.refresh_token.clone() {
                Some(refresh_token) => match self.refresh(&token, &refresh_token).await {
                    Ok(refreshed) => refreshed,
                    Err(e) => {
                        warn!(error = %e, "Token refresh failed, authorizing again");
                        self.authorize().await?
                    }
                },
                None => self.authorize().await?,
            },
            None => self.authorize().await?,
        };

        if let Some(store) = &self.store {
            store.save(&token)?;
        }
        let access_token = token.access_token.clone();
        *cache = Some(token);
        Ok(access_token)
    }

    fn load_stored(&self) -> GsuiteResult<Option<StoredToken>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let required: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        match store.load()? {
            Some(token) if token.covers(&required) => Ok(Some(token)),
            Some(_) => {
                info!("Cached token lacks required scopes, authorizing again");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Exchanges a refresh token for a new access token.
    #[instrument(skip_all)]
    async fn refresh(&self, current: &StoredToken, refresh_token: &str) -> GsuiteResult<StoredToken> {
        debug!("Refreshing access token");
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.expose_secret()),
        ];

        let response = self
            .token_request(&params)
            .await
            .map_err(|e| GsuiteError::TokenRefresh(e.to_string()))?;

        Ok(StoredToken::new(
            response.access_token,
            response
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            response.expires_in,
            response
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_else(|| current.scopes.clone()),
        ))
    }

    /// Runs the interactive flow and exchanges the code.
    async fn authorize(&self) -> GsuiteResult<StoredToken> {
        let grant = self.authorizer.authorize(&self.secrets, &self.scopes).await?;
        let params = [
            ("grant_type", "authorization_code"),
            ("code", grant.code.as_str()),
            ("redirect_uri", grant.redirect_uri.as_str()),
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.expose_secret()),
        ];

        let response = self.token_request(&params).await?;
        info!("Authorized directory access");

        Ok(StoredToken::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            response
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_else(|| self.scopes.clone()),
        ))
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> GsuiteResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.secrets.token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| GsuiteError::Auth(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<OAuthError>(&body)
                .map(|e| e.describe())
                .unwrap_or(body);
            return Err(GsuiteError::Auth(format!(
                "Token request failed with status {status}: {detail}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GsuiteError::Auth(format!("Failed to parse token response: {e}")))
    }

    /// Forces a refresh on next use, keeping the refresh token.
    pub async fn invalidate(&self) {
        let mut cache = self.cached_token.write().await;
        if let Some(token) = cache.as_mut() {
            token.expires_at = chrono::DateTime::<chrono::Utc>::MIN_UTC;
        }
    }
}
