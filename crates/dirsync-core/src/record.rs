//! Canonical, source-agnostic identity records.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::key::IdentityKey;

/// Attribute holding a human-readable name.
pub const ATTR_DISPLAY_NAME: &str = "display_name";
/// Attribute holding the directory organizational unit path.
pub const ATTR_ORG_UNIT: &str = "org_unit";
/// Attribute holding the membership group email.
pub const ATTR_GROUP: &str = "group";
/// Attribute holding `"true"`/`"false"` for actives-group membership.
pub const ATTR_ACTIVE: &str = "active";

/// Which side of the reconciliation a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// The authoritative membership registry (MyAEGEE).
    Registry,
    /// The directory being checked for drift.
    Directory,
}

impl Source {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Registry => "registry",
            Source::Directory => "directory",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical membership status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Active member (holds a directory account in good standing).
    Active,
    /// Plain member.
    Member,
    /// Suspended, archived or deactivated.
    Inactive,
    /// Source did not say.
    #[default]
    Unknown,
}

impl Status {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Member => "MEMBER",
            Status::Inactive => "INACTIVE",
            Status::Unknown => "UNKNOWN",
        }
    }

    /// Whether the identity counts as a current member at all.
    #[must_use]
    pub fn is_current(&self) -> bool {
        matches!(self, Status::Active | Status::Member)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(Status::Active),
            "MEMBER" => Ok(Status::Member),
            "INACTIVE" => Ok(Status::Inactive),
            "UNKNOWN" => Ok(Status::Unknown),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Error parsing a status from string.
#[derive(Debug, Clone)]
pub struct ParseStatusError(String);

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid status '{}', expected one of: active, member, inactive, unknown",
            self.0
        )
    }
}

impl std::error::Error for ParseStatusError {}

/// One normalized identity with its status and attributes.
///
/// Records are immutable once built; use [`CanonicalRecord::builder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    key: IdentityKey,
    status: Status,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    aliases: BTreeSet<IdentityKey>,
}

impl CanonicalRecord {
    /// Start building a record for `key`.
    #[must_use]
    pub fn builder(key: IdentityKey) -> CanonicalRecordBuilder {
        CanonicalRecordBuilder {
            key,
            status: Status::Unknown,
            attributes: BTreeMap::new(),
            aliases: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &IdentityKey {
        &self.key
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Secondary identity keys (other addresses of the same person).
    #[must_use]
    pub fn aliases(&self) -> &BTreeSet<IdentityKey> {
        &self.aliases
    }

    /// Display name if known, else the key.
    #[must_use]
    pub fn label(&self) -> &str {
        self.attribute(ATTR_DISPLAY_NAME)
            .unwrap_or_else(|| self.key.as_str())
    }
}

/// Builder for [`CanonicalRecord`].
#[derive(Debug, Clone)]
pub struct CanonicalRecordBuilder {
    key: IdentityKey,
    status: Status,
    attributes: BTreeMap<String, String>,
    aliases: BTreeSet<IdentityKey>,
}

impl CanonicalRecordBuilder {
    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Set an attribute. Blank values are ignored.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.attributes.insert(name.into(), value);
        }
        self
    }

    /// Set an attribute if a value is present.
    #[must_use]
    pub fn maybe_attribute(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.attribute(name, v),
            None => self,
        }
    }

    /// Add a secondary key. An alias equal to the primary key is dropped.
    #[must_use]
    pub fn alias(mut self, alias: IdentityKey) -> Self {
        if alias != self.key {
            self.aliases.insert(alias);
        }
        self
    }

    #[must_use]
    pub fn build(self) -> CanonicalRecord {
        CanonicalRecord {
            key: self.key,
            status: self.status,
            attributes: self.attributes,
            aliases: self.aliases,
        }
    }
}
