//! # dirsync-connector-gsuite
//!
//! Read-only Google Workspace Admin SDK connector for dirsync.
//!
//! Lists directory users and group members with the installed-app OAuth2
//! flow. Tokens are cached on disk with owner-only permissions and refreshed
//! transparently.
//!
//! ## Example
//!
//! ```no_run
//! use dirsync_connector_gsuite::{ClientSecrets, DirectoryClient, TokenCache, TokenStore, DEFAULT_API_BASE};
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), dirsync_connector_gsuite::GsuiteError> {
//! let secrets = ClientSecrets::from_file(Path::new("credentials.json"))?;
//! let tokens = Arc::new(TokenCache::new(secrets, Some(TokenStore::new("token.json"))));
//! let client = DirectoryClient::new(tokens, DEFAULT_API_BASE, Duration::from_secs(30))?;
//!
//! let members = client.list_group_members("members@aegee-muenchen.de").await?;
//! println!("{} group members", members.len());
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod error;
mod secrets;
mod store;

pub use auth::{
    AuthorizationCode, Authorizer, LoopbackFlow, TokenCache, DIRECTORY_SCOPES,
    SCOPE_GROUP_MEMBER_READONLY, SCOPE_USER_READONLY,
};
pub use client::{
    annotate_memberships, DirectoryClient, GoogleError, GoogleErrorBody, GoogleErrorItem,
    DEFAULT_API_BASE, MY_CUSTOMER,
};
pub use error::{GsuiteError, GsuiteResult};
pub use secrets::{ClientSecrets, DEFAULT_AUTH_URI, DEFAULT_TOKEN_URI};
pub use store::{StoredToken, TokenStore};
