//! Where the two snapshots come from.
//!
//! The pipeline only sees raw records through these traits; the real
//! implementations wrap the MyAEGEE and Admin SDK clients.

use async_trait::async_trait;
use tracing::info;

use dirsync_connector_gsuite::{annotate_memberships, DirectoryClient};
use dirsync_connector_myaegee::MyAegeeClient;
use dirsync_core::{DirectoryMember, DirectoryUser, RegistryMember};

use crate::error::CliResult;

/// The membership registry.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Every membership of the local body.
    async fn members(&self) -> CliResult<Vec<RegistryMember>>;
}

/// The Workspace directory.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Every member of `group`, tagged with the group.
    async fn group_members(&self, group: &str) -> CliResult<Vec<DirectoryMember>>;

    /// Every user account, with `member_of` filled in for `groups`.
    async fn users(&self, groups: &[String]) -> CliResult<Vec<DirectoryUser>>;
}

/// MyAEGEE body members.
pub struct MyAegeeSource {
    client: MyAegeeClient,
    body_id: i64,
}

impl MyAegeeSource {
    pub fn new(client: MyAegeeClient, body_id: i64) -> Self {
        Self { client, body_id }
    }
}

#[async_trait]
impl RegistrySource for MyAegeeSource {
    async fn members(&self) -> CliResult<Vec<RegistryMember>> {
        let members = self.client.body_members(self.body_id).await?;
        info!(body_id = self.body_id, count = members.len(), "Fetched registry members");
        Ok(members)
    }
}

/// Admin SDK users and groups.
pub struct WorkspaceSource {
    client: DirectoryClient,
    customer: String,
    domain: Option<String>,
}

impl WorkspaceSource {
    pub fn new(client: DirectoryClient, customer: impl Into<String>, domain: Option<String>) -> Self {
        Self {
            client,
            customer: customer.into(),
            domain,
        }
    }
}

#[async_trait]
impl DirectorySource for WorkspaceSource {
    async fn group_members(&self, group: &str) -> CliResult<Vec<DirectoryMember>> {
        Ok(self.client.list_group_members(group).await?)
    }

    async fn users(&self, groups: &[String]) -> CliResult<Vec<DirectoryUser>> {
        let mut users = self
            .client
            .list_users(&self.customer, self.domain.as_deref())
            .await?;
        for group in groups {
            let members = self.client.list_group_members(group).await?;
            annotate_memberships(&mut users, group, &members);
        }
        Ok(users)
    }
}
