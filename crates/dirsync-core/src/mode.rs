//! Sync modes and the comparison profile each one selects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::record::{CanonicalRecord, Status, ATTR_ACTIVE, ATTR_GROUP, ATTR_ORG_UNIT};

/// Pseudo-field name under which the projected status is compared.
pub const FIELD_STATUS: &str = "status";

/// Which population is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Registry members against the members group's membership list.
    MembersSync,
    /// Registry members against directory accounts.
    ActivesSync,
}

impl SyncMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::MembersSync => "members-sync",
            SyncMode::ActivesSync => "actives-sync",
        }
    }

    /// The comparison profile for this mode.
    #[must_use]
    pub fn profile(&self) -> ModeProfile {
        match self {
            SyncMode::MembersSync => ModeProfile {
                current_label: "member",
                fields: &[FIELD_STATUS, ATTR_GROUP],
            },
            SyncMode::ActivesSync => ModeProfile {
                current_label: "active",
                fields: &[FIELD_STATUS, ATTR_ORG_UNIT, ATTR_ACTIVE],
            },
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = ParseSyncModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "members-sync" | "members" => Ok(SyncMode::MembersSync),
            "actives-sync" | "actives" => Ok(SyncMode::ActivesSync),
            _ => Err(ParseSyncModeError(s.to_string())),
        }
    }
}

/// Error parsing a sync mode from string.
#[derive(Debug, Clone)]
pub struct ParseSyncModeError(String);

impl fmt::Display for ParseSyncModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid sync mode '{}', expected members-sync or actives-sync",
            self.0
        )
    }
}

impl std::error::Error for ParseSyncModeError {}

/// Status predicate and attribute subset consulted by one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeProfile {
    current_label: &'static str,
    fields: &'static [&'static str],
}

impl ModeProfile {
    /// Fields compared for matched identities, `status` first.
    #[must_use]
    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    /// Collapse a canonical status onto the values this mode distinguishes.
    #[must_use]
    pub fn project(&self, status: Status) -> &'static str {
        match status {
            Status::Active | Status::Member => self.current_label,
            Status::Inactive => "inactive",
            Status::Unknown => "unknown",
        }
    }

    /// Value of `field` as this mode sees it.
    #[must_use]
    pub fn value<'a>(&self, record: &'a CanonicalRecord, field: &str) -> Option<&'a str> {
        if field == FIELD_STATUS {
            Some(self.project(record.status()))
        } else {
            record.attribute(field)
        }
    }

    /// Fields on which `directory` deviates from `registry`.
    ///
    /// Only attributes the registry record carries are compared.
    #[must_use]
    pub fn mismatches(
        &self,
        registry: &CanonicalRecord,
        directory: &CanonicalRecord,
    ) -> BTreeSet<String> {
        self.fields
            .iter()
            .filter(|field| match self.value(registry, field) {
                Some(expected) => self.value(directory, field) != Some(expected),
                None => false,
            })
            .map(|field| (*field).to_string())
            .collect()
    }
}
