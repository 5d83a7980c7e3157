//! Token cache tests: authorization, refresh and on-disk persistence.

mod common;

use common::*;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dirsync_connector_gsuite::{GsuiteError, StoredToken, TokenStore, DIRECTORY_SCOPES};

fn directory_scopes() -> Vec<String> {
    DIRECTORY_SCOPES.iter().map(|s| (*s).to_string()).collect()
}

#[tokio::test]
async fn test_first_run_authorizes_and_persists() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    let authorizer = Arc::new(StaticAuthorizer::default());

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("client_id=client-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("access-1", Some("refresh-1"))))
        .expect(1)
        .mount(&server)
        .await;

    let cache = token_cache(&server, Some(store.clone()), authorizer.clone());
    assert_eq!(cache.get_token().await.unwrap(), "access-1");
    assert_eq!(cache.get_token().await.unwrap(), "access-1");
    assert_eq!(authorizer.calls.load(Ordering::SeqCst), 1);

    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.access_token, "access-1");
    assert_eq!(saved.refresh_token.as_deref(), Some("refresh-1"));
    assert!(saved.covers(&DIRECTORY_SCOPES));
}

#[tokio::test]
async fn test_valid_stored_token_is_reused() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    store
        .save(&StoredToken::new(
            "stored-access".to_string(),
            Some("stored-refresh".to_string()),
            3600,
            directory_scopes(),
        ))
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let authorizer = Arc::new(StaticAuthorizer::default());
    let cache = token_cache(&server, Some(store), authorizer.clone());
    assert_eq!(cache.get_token().await.unwrap(), "stored-access");
    assert_eq!(authorizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expired_stored_token_is_refreshed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    store
        .save(&StoredToken::new(
            "old-access".to_string(),
            Some("stored-refresh".to_string()),
            -60,
            directory_scopes(),
        ))
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=stored-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("new-access", None)))
        .expect(1)
        .mount(&server)
        .await;

    let authorizer = Arc::new(StaticAuthorizer::default());
    let cache = token_cache(&server, Some(store.clone()), authorizer.clone());
    assert_eq!(cache.get_token().await.unwrap(), "new-access");
    assert_eq!(authorizer.calls.load(Ordering::SeqCst), 0);

    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.access_token, "new-access");
    assert_eq!(saved.refresh_token.as_deref(), Some("stored-refresh"));
}

#[tokio::test]
async fn test_revoked_refresh_token_falls_back_to_authorization() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    store
        .save(&StoredToken::new(
            "old-access".to_string(),
            Some("revoked".to_string()),
            -60,
            directory_scopes(),
        ))
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_token_exchange(&server, "fresh-access", Some("fresh-refresh")).await;

    let authorizer = Arc::new(StaticAuthorizer::default());
    let cache = token_cache(&server, Some(store.clone()), authorizer.clone());
    assert_eq!(cache.get_token().await.unwrap(), "fresh-access");
    assert_eq!(authorizer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.load().unwrap().unwrap().refresh_token.as_deref(),
        Some("fresh-refresh")
    );
}

#[tokio::test]
async fn test_stored_token_without_required_scopes_is_ignored() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    store
        .save(&StoredToken::new(
            "narrow-access".to_string(),
            Some("narrow-refresh".to_string()),
            3600,
            vec![DIRECTORY_SCOPES[0].to_string()],
        ))
        .unwrap();
    mount_token_exchange(&server, "wide-access", Some("wide-refresh")).await;

    let authorizer = Arc::new(StaticAuthorizer::default());
    let cache = token_cache(&server, Some(store), authorizer.clone());
    assert_eq!(cache.get_token().await.unwrap(), "wide-access");
    assert_eq!(authorizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalidate_forces_refresh() {
    let server = MockServer::start().await;
    mount_token_exchange(&server, "access-1", Some("refresh-1")).await;
    mount_token_refresh(&server, "access-2").await;

    let authorizer = Arc::new(StaticAuthorizer::default());
    let cache = token_cache(&server, None, authorizer.clone());
    assert_eq!(cache.get_token().await.unwrap(), "access-1");

    cache.invalidate().await;
    assert_eq!(cache.get_token().await.unwrap(), "access-2");
    assert_eq!(authorizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rejected_code_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "The OAuth client was not found."
        })))
        .mount(&server)
        .await;

    let cache = token_cache(&server, None, Arc::new(StaticAuthorizer::default()));
    let error = cache.get_token().await.unwrap_err();
    assert!(matches!(error, GsuiteError::Auth(_)));
    assert!(error.to_string().contains("invalid_client: The OAuth client was not found."));
}
