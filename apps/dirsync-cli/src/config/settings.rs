//! JSON configuration file
//!
//! Every field has a default, so a missing file or a partial one is fine.
//! Command-line flags override what is read here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use dirsync_connector_gsuite::{DEFAULT_API_BASE, MY_CUSTOMER};
use dirsync_connector_myaegee::MyAegeeConfig;
use dirsync_core::{default_domain_aliases, NormalizerConfig, SyncMode, DEFAULT_NAME_THRESHOLD};

use crate::error::{CliError, CliResult};

/// MyAEGEE body id of AEGEE-München.
pub const DEFAULT_BODY_ID: i64 = 117;

const DEFAULT_DOMAIN: &str = "aegee-muenchen.de";

/// Role accounts that exist in the directory but belong to no member.
const EXCLUDED_ROLE_ACCOUNTS: &[&str] = &[
    "admin",
    "archive",
    "events",
    "externalrelations",
    "info",
    "internalrelations",
    "it",
    "president",
    "secretary",
    "treasurer",
    "european.affairs",
    "publicrelations",
    "projectmanager",
    "su",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub myaegee: MyAegeeConfig,
    pub directory: DirectorySettings,
    pub sync: SyncSettings,
}

/// Google Workspace connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    pub api_base: String,
    /// OAuth endpoints; the client secrets file's own are used when unset.
    pub auth_uri: Option<String>,
    pub token_uri: Option<String>,
    pub customer: String,
    /// Restricts user listings to one domain when set.
    pub domain: Option<String>,
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            auth_uri: None,
            token_uri: None,
            customer: MY_CUSTOMER.to_string(),
            domain: Some(DEFAULT_DOMAIN.to_string()),
            page_size: 200,
            timeout_secs: 30,
        }
    }
}

/// What the directory is expected to look like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub members_group: String,
    /// Group whose membership marks an account as active. When set,
    /// actives-sync also compares each account's membership in it.
    pub actives_group: Option<String>,
    /// Org unit every member account should live in; not compared when unset.
    pub org_unit: Option<String>,
    /// Directory addresses never reported (role and service accounts).
    pub excluded: Vec<String>,
    pub domain_aliases: BTreeMap<String, String>,
    /// Pair unmatched accounts by display name in actives-sync.
    pub name_matching: bool,
    pub name_threshold: f64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            members_group: format!("members@{DEFAULT_DOMAIN}"),
            actives_group: None,
            org_unit: None,
            excluded: EXCLUDED_ROLE_ACCOUNTS
                .iter()
                .map(|local| format!("{local}@{DEFAULT_DOMAIN}"))
                .collect(),
            domain_aliases: default_domain_aliases(),
            name_matching: true,
            name_threshold: DEFAULT_NAME_THRESHOLD,
        }
    }
}

impl Config {
    /// Read a configuration file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&json).map_err(|e| {
            CliError::Config(format!("Invalid configuration in {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> CliResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> CliResult<()> {
        let actives_blank = self
            .sync
            .actives_group
            .as_deref()
            .is_some_and(|g| g.trim().is_empty());
        if self.sync.members_group.trim().is_empty() || actives_blank {
            return Err(CliError::Config("group addresses must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.sync.name_threshold) {
            return Err(CliError::Config(format!(
                "name_threshold must be between 0 and 1, got {}",
                self.sync.name_threshold
            )));
        }
        if !(1..=500).contains(&self.directory.page_size) {
            return Err(CliError::Config(format!(
                "page_size must be between 1 and 500, got {}",
                self.directory.page_size
            )));
        }
        Ok(())
    }

    /// Normalizer settings for one sync mode.
    ///
    /// Only the expectations the mode compares are set, so registry records
    /// carry no attribute the other side cannot be checked against.
    pub fn normalizer_config(&self, mode: SyncMode) -> NormalizerConfig {
        let mut config = NormalizerConfig {
            domain_aliases: self.sync.domain_aliases.clone(),
            ..NormalizerConfig::default()
        };
        match mode {
            SyncMode::MembersSync => {
                config = config.with_members_group(self.sync.members_group.as_str());
            }
            SyncMode::ActivesSync => {
                if let Some(actives) = &self.sync.actives_group {
                    config = config.with_actives_group(actives.as_str());
                }
                if let Some(org_unit) = &self.sync.org_unit {
                    config = config.with_org_unit(org_unit.as_str());
                }
            }
        }
        config
    }

    /// Name-matching threshold for `mode`, if name matching applies.
    pub fn name_threshold(&self, mode: SyncMode) -> Option<f64> {
        (mode == SyncMode::ActivesSync && self.sync.name_matching).then_some(self.sync.name_threshold)
    }
}
