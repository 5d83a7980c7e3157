//! Common test utilities for dirsync-connector-gsuite integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

use dirsync_connector_gsuite::{
    AuthorizationCode, Authorizer, ClientSecrets, DirectoryClient, GsuiteResult, TokenCache,
    TokenStore, DIRECTORY_SCOPES,
};

/// Authorizer that hands out a fixed code and counts how often it was asked.
#[derive(Default)]
pub struct StaticAuthorizer {
    pub calls: AtomicU32,
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn authorize(
        &self,
        _secrets: &ClientSecrets,
        _scopes: &[String],
    ) -> GsuiteResult<AuthorizationCode> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AuthorizationCode {
            code: "auth-code".to_string(),
            redirect_uri: "http://127.0.0.1:4242".to_string(),
        })
    }
}

/// Client secrets pointing at the mock server.
pub fn secrets(server: &MockServer) -> ClientSecrets {
    ClientSecrets::from_json(r#"{"installed": {"client_id": "client-1", "client_secret": "secret-1"}}"#)
        .unwrap()
        .with_endpoints(
            format!("{}/o/oauth2/auth", server.uri()),
            format!("{}/token", server.uri()),
        )
}

pub fn token_cache(
    server: &MockServer,
    store: Option<TokenStore>,
    authorizer: Arc<StaticAuthorizer>,
) -> Arc<TokenCache> {
    Arc::new(TokenCache::with_authorizer(secrets(server), store, authorizer))
}

/// Directory client with fast retries, authorized through [`StaticAuthorizer`].
pub async fn directory_client(server: &MockServer) -> DirectoryClient {
    mount_token_exchange(server, "access-1", Some("refresh-1")).await;
    let tokens = token_cache(server, None, Arc::new(StaticAuthorizer::default()));
    DirectoryClient::new(tokens, &server.uri(), Duration::from_secs(5))
        .unwrap()
        .with_retry_policy(3, Duration::from_millis(10))
}

/// Token endpoint response.
pub fn token_response(access_token: &str, refresh_token: Option<&str>) -> Value {
    let mut response = json!({
        "access_token": access_token,
        "expires_in": 3599,
        "scope": DIRECTORY_SCOPES.join(" "),
        "token_type": "Bearer"
    });
    if let Some(refresh_token) = refresh_token {
        response["refresh_token"] = json!(refresh_token);
    }
    response
}

/// Answers the authorization-code grant.
pub async fn mount_token_exchange(server: &MockServer, access_token: &str, refresh_token: Option<&str>) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response(access_token, refresh_token)))
        .mount(server)
        .await;
}

/// Answers the refresh-token grant.
pub async fn mount_token_refresh(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response(access_token, None)))
        .mount(server)
        .await;
}

/// Test data factory for directory users.
pub fn create_user(local: &str, given: &str, family: &str) -> Value {
    json!({
        "kind": "admin#directory#user",
        "id": format!("id-{local}"),
        "primaryEmail": format!("{local}@aegee-muenchen.de"),
        "name": {
            "givenName": given,
            "familyName": family,
            "fullName": format!("{given} {family}")
        },
        "emails": [
            {"address": format!("{local}@aegee-muenchen.de"), "primary": true}
        ],
        "suspended": false,
        "orgUnitPath": "/"
    })
}

/// Test data factory for group members.
pub fn create_member(email: &str) -> Value {
    json!({
        "kind": "admin#directory#member",
        "id": format!("id-{email}"),
        "email": email,
        "role": "MEMBER",
        "type": "USER",
        "status": "ACTIVE"
    })
}

pub fn users_page(users: Vec<Value>, next_page_token: Option<&str>) -> Value {
    let mut page = json!({"kind": "admin#directory#users", "users": users});
    if let Some(token) = next_page_token {
        page["nextPageToken"] = json!(token);
    }
    page
}

pub fn members_page(members: Vec<Value>, next_page_token: Option<&str>) -> Value {
    let mut page = json!({"kind": "admin#directory#members", "members": members});
    if let Some(token) = next_page_token {
        page["nextPageToken"] = json!(token);
    }
    page
}

/// Google API error envelope.
pub fn create_google_error(code: u16, reason: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message,
            "errors": [{"message": message, "domain": "global", "reason": reason}]
        }
    })
}

/// Serves `pages` in order, then empty pages.
pub struct PaginatedResponder {
    pub pages: Vec<Value>,
    pub current_page: Arc<AtomicU32>,
}

impl PaginatedResponder {
    pub fn new(pages: Vec<Value>) -> Self {
        Self {
            pages,
            current_page: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl Respond for PaginatedResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let page_idx = self.current_page.fetch_add(1, Ordering::SeqCst) as usize;
        match self.pages.get(page_idx) {
            Some(page) => ResponseTemplate::new(200).set_body_json(page.clone()),
            None => ResponseTemplate::new(200).set_body_json(json!({})),
        }
    }
}
