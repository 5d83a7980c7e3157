//! Raw record shapes delivered by the registry and directory clients.
//!
//! These mirror the JSON the upstream APIs return (MyAEGEE body members,
//! Admin SDK users and group members). Every field is optional on the wire;
//! the normalizer decides what is required.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::record::Source;

/// A MyAEGEE body membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMember {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub body_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub user: Option<RegistryUser>,
}

/// The MyAEGEE user account behind a membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryUser {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Account activation flag; absent means active.
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub primary_email: Option<String>,
    #[serde(default)]
    pub notification_email: Option<String>,
    /// Set once the member has been given a Workspace account.
    #[serde(default)]
    pub gsuite_id: Option<String>,
    #[serde(default)]
    pub primary_body_id: Option<i64>,
}

impl RegistryUser {
    /// "First Last", skipping missing parts.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// An Admin SDK directory user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub primary_email: Option<String>,
    #[serde(default)]
    pub emails: Vec<DirectoryEmail>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub name: Option<DirectoryName>,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub org_unit_path: Option<String>,
    /// Groups the caller observed this user in. Not part of the users API.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub member_of: BTreeSet<String>,
}

/// One entry of a directory user's `emails` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEmail {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default, rename = "type")]
    pub email_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryName {
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// An Admin SDK group member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryMember {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// `OWNER`, `MANAGER` or `MEMBER`.
    #[serde(default)]
    pub role: Option<String>,
    /// `USER`, `GROUP`, `CUSTOMER` or `EXTERNAL`.
    #[serde(default, rename = "type")]
    pub member_type: Option<String>,
    /// `ACTIVE`, `SUSPENDED` or `UNKNOWN`.
    #[serde(default)]
    pub status: Option<String>,
    /// Group the member was listed from. Filled in by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Any raw record the normalizer accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RawRecord {
    RegistryMember(RegistryMember),
    DirectoryUser(DirectoryUser),
    DirectoryMember(DirectoryMember),
}

impl RawRecord {
    /// The source this record shape belongs to.
    #[must_use]
    pub fn origin(&self) -> Source {
        match self {
            Self::RegistryMember(_) => Source::Registry,
            Self::DirectoryUser(_) | Self::DirectoryMember(_) => Source::Directory,
        }
    }

    /// Short human-readable description used in error output.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::RegistryMember(m) => {
                let user = m.user.as_ref();
                format!(
                    "registry member id={} user={} email={}",
                    m.id.map_or_else(|| "?".to_string(), |id| id.to_string()),
                    user.and_then(RegistryUser::full_name)
                        .unwrap_or_else(|| "?".to_string()),
                    user.and_then(|u| u.email.as_deref()).unwrap_or("?"),
                )
            }
            Self::DirectoryUser(u) => format!(
                "directory user id={} primaryEmail={}",
                u.id.as_deref().unwrap_or("?"),
                u.primary_email.as_deref().unwrap_or("?"),
            ),
            Self::DirectoryMember(m) => format!(
                "group member id={} email={} group={}",
                m.id.as_deref().unwrap_or("?"),
                m.email.as_deref().unwrap_or("?"),
                m.group.as_deref().unwrap_or("?"),
            ),
        }
    }
}

impl From<RegistryMember> for RawRecord {
    fn from(member: RegistryMember) -> Self {
        Self::RegistryMember(member)
    }
}

impl From<DirectoryUser> for RawRecord {
    fn from(user: DirectoryUser) -> Self {
        Self::DirectoryUser(user)
    }
}

impl From<DirectoryMember> for RawRecord {
    fn from(member: DirectoryMember) -> Self {
        Self::DirectoryMember(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_member_parsing() {
        let json = r#"{
            "id": 42,
            "comment": null,
            "body_id": 117,
            "user_id": 7,
            "user": {
                "id": 7,
                "username": "alice",
                "email": "Alice@Gmail.com",
                "first_name": "Alice",
                "last_name": "Smith",
                "active": true,
                "gsuite_id": "alice.smith@aegee-muenchen.de",
                "superadmin": false
            }
        }"#;

        let member: RegistryMember = serde_json::from_str(json).unwrap();
        let user = member.user.as_ref().unwrap();
        assert_eq!(member.body_id, Some(117));
        assert_eq!(user.email.as_deref(), Some("Alice@Gmail.com"));
        assert_eq!(user.full_name().as_deref(), Some("Alice Smith"));
        assert_eq!(user.active, Some(true));
    }

    #[test]
    fn test_directory_user_parsing() {
        let json = r#"{
            "kind": "admin#directory#user",
            "id": "1001",
            "primaryEmail": "bob@aegee-muenchen.de",
            "name": {"givenName": "Bob", "familyName": "Jones", "fullName": "Bob Jones"},
            "emails": [
                {"address": "bob@aegee-muenchen.de", "primary": true},
                {"address": "bob@gmail.com", "type": "home"}
            ],
            "suspended": true,
            "orgUnitPath": "/Members"
        }"#;

        let user: DirectoryUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.primary_email.as_deref(), Some("bob@aegee-muenchen.de"));
        assert_eq!(user.emails.len(), 2);
        assert_eq!(user.emails[1].email_type.as_deref(), Some("home"));
        assert!(user.suspended);
        assert!(!user.archived);
        assert!(user.member_of.is_empty());
        assert_eq!(
            user.name.unwrap().full_name.as_deref(),
            Some("Bob Jones")
        );
    }

    #[test]
    fn test_directory_member_parsing() {
        let json = r#"{
            "kind": "admin#directory#member",
            "id": "2002",
            "email": "carol@gmail.com",
            "role": "MEMBER",
            "type": "USER",
            "status": "ACTIVE"
        }"#;

        let member: DirectoryMember = serde_json::from_str(json).unwrap();
        assert_eq!(member.member_type.as_deref(), Some("USER"));
        assert_eq!(member.status.as_deref(), Some("ACTIVE"));
        assert!(member.group.is_none());
    }

    #[test]
    fn test_raw_record_origin_and_describe() {
        let raw = RawRecord::from(DirectoryMember {
            id: Some("9".into()),
            email: Some("x@y.org".into()),
            group: Some("members@y.org".into()),
            ..Default::default()
        });
        assert_eq!(raw.origin(), Source::Directory);
        assert_eq!(raw.describe(), "group member id=9 email=x@y.org group=members@y.org");

        let raw = RawRecord::from(RegistryMember::default());
        assert_eq!(raw.origin(), Source::Registry);
        assert!(raw.describe().starts_with("registry member id=?"));
    }

    #[test]
    fn test_full_name_skips_blank_parts() {
        let user = RegistryUser {
            first_name: Some("  ".into()),
            last_name: Some("Solo".into()),
            ..Default::default()
        };
        assert_eq!(user.full_name().as_deref(), Some("Solo"));
        assert!(RegistryUser::default().full_name().is_none());
    }
}
