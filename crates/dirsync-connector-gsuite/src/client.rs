//! Admin SDK Directory API client with pagination and retry handling.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use dirsync_core::{DirectoryMember, DirectoryUser};

use crate::{GsuiteError, GsuiteResult, TokenCache};

/// Default Admin SDK endpoint.
pub const DEFAULT_API_BASE: &str = "https://admin.googleapis.com";

/// Customer alias for the authorizing account's own Workspace.
pub const MY_CUSTOMER: &str = "my_customer";

/// Upper bound on pages followed for one listing.
const MAX_PAGES: usize = 1_000;

/// Google API error envelope.
#[derive(Debug, Deserialize)]
pub struct GoogleError {
    pub error: GoogleErrorBody,
}

/// Google API error body.
#[derive(Debug, Deserialize)]
pub struct GoogleErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub errors: Vec<GoogleErrorItem>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleErrorItem {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GoogleError {
    fn into_error(self) -> GsuiteError {
        let reason = self
            .error
            .errors
            .iter()
            .find_map(|e| e.reason.clone())
            .or(self.error.status)
            .unwrap_or_else(|| "unknown".to_string());
        GsuiteError::Api {
            status: self.error.code,
            reason,
            message: self.error.message,
        }
    }
}

/// One page of a list response.
trait Page: DeserializeOwned {
    type Item;
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsersPage {
    #[serde(default)]
    users: Vec<DirectoryUser>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl Page for UsersPage {
    type Item = DirectoryUser;
    fn into_parts(self) -> (Vec<DirectoryUser>, Option<String>) {
        (self.users, self.next_page_token)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembersPage {
    #[serde(default)]
    members: Vec<DirectoryMember>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl Page for MembersPage {
    type Item = DirectoryMember;
    fn into_parts(self) -> (Vec<DirectoryMember>, Option<String>) {
        (self.members, self.next_page_token)
    }
}

/// Directory API client.
#[derive(Debug)]
pub struct DirectoryClient {
    http_client: reqwest::Client,
    token_cache: Arc<TokenCache>,
    base_url: Url,
    page_size: u32,
    max_retries: u32,
    initial_backoff: Duration,
}

impl DirectoryClient {
    /// Creates a new Directory client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be created.
    pub fn new(token_cache: Arc<TokenCache>, base_url: &str, timeout: Duration) -> GsuiteResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GsuiteError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            token_cache,
            base_url,
            page_size: 200,
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
        })
    }

    /// Results requested per page (clamped to the API's 1..=500).
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 500);
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff = initial_backoff;
        self
    }

    fn endpoint(&self, path: &str) -> GsuiteResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    /// Lists every user of a customer, optionally restricted to one domain.
    ///
    /// # Errors
    ///
    /// Returns an error if any page fails after retries.
    #[instrument(skip(self))]
    pub async fn list_users(&self, customer: &str, domain: Option<&str>) -> GsuiteResult<Vec<DirectoryUser>> {
        let mut url = self.endpoint("/admin/directory/v1/users")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("customer", customer);
            if let Some(domain) = domain {
                query.append_pair("domain", domain);
            }
            query.append_pair("orderBy", "email");
            query.append_pair("maxResults", &self.page_size.clamp(1, 500).to_string());
        }

        let users = self.list_all::<UsersPage>(url).await?;
        info!(count = users.len(), "Fetched directory users");
        Ok(users)
    }

    /// Lists every member of a group. Each member is tagged with `group`.
    ///
    /// # Errors
    ///
    /// Returns an error if any page fails after retries.
    #[instrument(skip(self))]
    pub async fn list_group_members(&self, group: &str) -> GsuiteResult<Vec<DirectoryMember>> {
        let mut url = self.endpoint("/admin/directory/v1/groups")?;
        url.path_segments_mut()
            .map_err(|()| GsuiteError::Config("base URL cannot carry a path".to_string()))?
            .push(group)
            .push("members");
        url.query_pairs_mut()
            .append_pair("maxResults", &self.page_size.clamp(1, 200).to_string());

        let mut members = self.list_all::<MembersPage>(url).await?;
        for member in &mut members {
            member.group = Some(group.to_string());
        }
        info!(group, count = members.len(), "Fetched group members");
        Ok(members)
    }

    /// Follows `nextPageToken` until the listing is complete.
    async fn list_all<P: Page>(&self, url: Url) -> GsuiteResult<Vec<P::Item>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let mut page_url = url.clone();
            if let Some(token) = &page_token {
                page_url.query_pairs_mut().append_pair("pageToken", token);
            }

            debug!(page, url = %page_url, "Fetching page");
            let (batch, next) = self.get::<P>(page_url).await?.into_parts();
            items.extend(batch);

            match next.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => return Ok(items),
            }
        }

        Err(GsuiteError::Config(format!(
            "listing did not finish within {MAX_PAGES} pages"
        )))
    }

    /// GET with token injection, one forced refresh on 401 and exponential
    /// backoff on 429/502/503/504.
    async fn get<T: DeserializeOwned>(&self, url: Url) -> GsuiteResult<T> {
        let mut retries = 0;
        let mut delay = self.initial_backoff;
        let mut refreshed = false;

        loop {
            let token = self.token_cache.get_token().await?;
            let response = self
                .http_client
                .get(url.clone())
                .bearer_auth(&token)
                .send()
                .await?;
            let status = response.status();

            if status == reqwest::StatusCode::UNAUTHORIZED && !refreshed {
                warn!("Access token refused, refreshing");
                refreshed = true;
                self.token_cache.invalidate().await;
                continue;
            }

            if matches!(
                status,
                reqwest::StatusCode::TOO_MANY_REQUESTS
                    | reqwest::StatusCode::BAD_GATEWAY
                    | reqwest::StatusCode::SERVICE_UNAVAILABLE
                    | reqwest::StatusCode::GATEWAY_TIMEOUT
            ) {
                if retries >= self.max_retries {
                    return Err(GsuiteError::MaxRetriesExceeded { attempts: retries });
                }
                retries += 1;
                let wait = retry_after(&response).unwrap_or(delay);
                warn!(
                    "Transient error {}, retry {}/{} after {:?}",
                    status, retries, self.max_retries, wait
                );
                tokio::time::sleep(wait).await;
                delay *= 2;
                continue;
            }

            if status.is_success() {
                return response.json().await.map_err(GsuiteError::from);
            }

            let body = response.text().await.unwrap_or_default();
            if let Ok(error) = serde_json::from_str::<GoogleError>(&body) {
                return Err(error.into_error());
            }
            return Err(GsuiteError::Api {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
                message: body,
            });
        }
    }
}

/// `Retry-After` in seconds, capped at one minute.
fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs.min(60)))
}

/// Record `group` on every user whose email appears among `members`.
///
/// Matches primary addresses and secondary `emails[]` case-insensitively.
pub fn annotate_memberships(users: &mut [DirectoryUser], group: &str, members: &[DirectoryMember]) {
    let emails: std::collections::BTreeSet<String> = members
        .iter()
        .filter_map(|m| m.email.as_deref())
        .map(|e| e.trim().to_lowercase())
        .collect();

    for user in users {
        let addresses = user
            .primary_email
            .iter()
            .chain(user.emails.iter().filter_map(|e| e.address.as_ref()));
        let is_member = addresses
            .map(|a| a.trim().to_lowercase())
            .any(|a| emails.contains(&a));
        if is_member {
            user.member_of.insert(group.to_string());
        }
    }
}
