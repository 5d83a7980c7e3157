//! Record normalizer.
//!
//! Maps the raw registry and directory shapes onto [`CanonicalRecord`]s keyed
//! by [`IdentityKey`]. The mapping is pure: the same raw record and config
//! always yield the same canonical record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ReconcileError, ReconcileResult};
use crate::key::{default_domain_aliases, IdentityKey};
use crate::raw::{DirectoryMember, DirectoryUser, RawRecord, RegistryMember};
use crate::record::{
    CanonicalRecord, Source, Status, ATTR_ACTIVE, ATTR_DISPLAY_NAME, ATTR_GROUP, ATTR_ORG_UNIT,
};

/// Settings that shape the registry's expected directory state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Domain alias table applied to every key and alias.
    #[serde(default = "default_domain_aliases")]
    pub domain_aliases: BTreeMap<String, String>,

    /// Group every current registry member is expected to belong to.
    #[serde(default)]
    pub members_group: Option<String>,

    /// Group every current registry member with an account is expected in.
    #[serde(default)]
    pub actives_group: Option<String>,

    /// Org unit expected for every registry member.
    #[serde(default)]
    pub org_unit: Option<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            domain_aliases: default_domain_aliases(),
            members_group: None,
            actives_group: None,
            org_unit: None,
        }
    }
}

impl NormalizerConfig {
    #[must_use]
    pub fn with_members_group(mut self, group: impl Into<String>) -> Self {
        self.members_group = Some(group.into());
        self
    }

    #[must_use]
    pub fn with_actives_group(mut self, group: impl Into<String>) -> Self {
        self.actives_group = Some(group.into());
        self
    }

    #[must_use]
    pub fn with_org_unit(mut self, org_unit: impl Into<String>) -> Self {
        self.org_unit = Some(org_unit.into());
        self
    }
}

/// Converts raw records into canonical records.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    #[must_use]
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Parse and fold an identity value.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::InvalidKey` for blank input.
    pub fn key(&self, raw: &str) -> ReconcileResult<IdentityKey> {
        Ok(IdentityKey::parse(raw)?.fold_domain(&self.config.domain_aliases))
    }

    /// Normalize one raw record read from `source`.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::MalformedRecord` when the record has no usable
    /// identity or its shape does not belong to `source`.
    pub fn normalize(&self, raw: &RawRecord, source: Source) -> ReconcileResult<CanonicalRecord> {
        if raw.origin() != source {
            return Err(ReconcileError::malformed(
                source,
                format!("a {} record cannot be read from the {source}", raw.origin()),
                raw,
            ));
        }

        match raw {
            RawRecord::RegistryMember(member) => self.normalize_registry(member, raw),
            RawRecord::DirectoryUser(user) => self.normalize_directory_user(user, raw),
            RawRecord::DirectoryMember(member) => self.normalize_group_member(member, raw),
        }
    }

    fn identity(
        &self,
        value: Option<&str>,
        field: &str,
        source: Source,
        raw: &RawRecord,
    ) -> ReconcileResult<IdentityKey> {
        let value = value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
            ReconcileError::malformed(source, format!("missing {field}"), raw)
        })?;
        self.key(value)
            .map_err(|e| ReconcileError::malformed(source, e.to_string(), raw))
    }

    /// Aliases that fail to parse are skipped.
    fn aliases<'a>(&self, values: impl IntoIterator<Item = &'a str>) -> Vec<IdentityKey> {
        values
            .into_iter()
            .filter_map(|v| self.key(v).ok())
            .collect()
    }

    fn normalize_registry(
        &self,
        member: &RegistryMember,
        raw: &RawRecord,
    ) -> ReconcileResult<CanonicalRecord> {
        let user = member.user.as_ref().ok_or_else(|| {
            ReconcileError::malformed(Source::Registry, "membership without user", raw)
        })?;
        let key = self.identity(user.email.as_deref(), "user.email", Source::Registry, raw)?;

        let status = if user.active == Some(false) {
            Status::Inactive
        } else if user.gsuite_id.as_deref().is_some_and(|id| !id.trim().is_empty()) {
            Status::Active
        } else {
            Status::Member
        };

        let mut builder = CanonicalRecord::builder(key)
            .status(status)
            .maybe_attribute(ATTR_DISPLAY_NAME, user.full_name())
            .maybe_attribute(ATTR_ORG_UNIT, self.config.org_unit.clone());

        if status.is_current() {
            let group = self.config.members_group.as_deref().map(normalize_group);
            builder = builder.maybe_attribute(ATTR_GROUP, group);
            if self.config.actives_group.is_some() {
                builder = builder.attribute(ATTR_ACTIVE, "true");
            }
        }

        for alias in self.aliases(
            [user.primary_email.as_deref(), user.notification_email.as_deref()]
                .into_iter()
                .flatten(),
        ) {
            builder = builder.alias(alias);
        }

        Ok(builder.build())
    }

    fn normalize_directory_user(
        &self,
        user: &DirectoryUser,
        raw: &RawRecord,
    ) -> ReconcileResult<CanonicalRecord> {
        let key = self.identity(
            user.primary_email.as_deref(),
            "primaryEmail",
            Source::Directory,
            raw,
        )?;

        let status = if user.suspended || user.archived {
            Status::Inactive
        } else {
            Status::Active
        };

        let mut builder = CanonicalRecord::builder(key)
            .status(status)
            .maybe_attribute(
                ATTR_DISPLAY_NAME,
                user.name.as_ref().and_then(|n| n.full_name.clone()),
            )
            .maybe_attribute(ATTR_ORG_UNIT, user.org_unit_path.clone());

        if let Some(actives) = self.config.actives_group.as_deref() {
            let actives = normalize_group(actives);
            let is_active = user.member_of.iter().any(|g| normalize_group(g) == actives);
            builder = builder.attribute(ATTR_ACTIVE, is_active.to_string());
        }

        let aliases = user
            .emails
            .iter()
            .filter_map(|e| e.address.as_deref())
            .chain(user.aliases.iter().map(String::as_str));
        for alias in self.aliases(aliases) {
            builder = builder.alias(alias);
        }

        Ok(builder.build())
    }

    fn normalize_group_member(
        &self,
        member: &DirectoryMember,
        raw: &RawRecord,
    ) -> ReconcileResult<CanonicalRecord> {
        let key = self.identity(member.email.as_deref(), "email", Source::Directory, raw)?;

        let status = match member.status.as_deref().map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("ACTIVE") => Status::Member,
            Some(s) if s.eq_ignore_ascii_case("SUSPENDED") => Status::Inactive,
            _ => Status::Unknown,
        };

        Ok(CanonicalRecord::builder(key)
            .status(status)
            .maybe_attribute(ATTR_GROUP, member.group.as_deref().map(normalize_group))
            .build())
    }
}

fn normalize_group(group: &str) -> String {
    group.trim().to_lowercase()
}
