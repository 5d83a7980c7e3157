//! Reconciliation engine.
//!
//! Compares a registry snapshot with a directory snapshot and produces the
//! ordered list of discrepancies an operator has to resolve in the directory.
//! Both sync modes run through the same set algebra; the [`SyncMode`] only
//! selects the status projection and the compared attributes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info};

use crate::correlation::NameMatcher;
use crate::key::IdentityKey;
use crate::mode::{ModeProfile, SyncMode};
use crate::record::CanonicalRecord;
use crate::snapshot::{DirectorySet, RegistrySet};

/// Classification of a discrepancy.
///
/// The variant order is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyKind {
    /// In the registry, absent from the directory.
    MissingInDirectory,
    /// In the directory, absent from the registry.
    MissingInRegistry,
    /// On both sides with differing mode-relevant fields.
    AttributeMismatch,
}

impl DiscrepancyKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscrepancyKind::MissingInDirectory => "MISSING_IN_DIRECTORY",
            DiscrepancyKind::MissingInRegistry => "MISSING_IN_REGISTRY",
            DiscrepancyKind::AttributeMismatch => "ATTRIBUTE_MISMATCH",
        }
    }

    /// All kinds in report order.
    #[must_use]
    pub fn all() -> [DiscrepancyKind; 3] {
        [
            DiscrepancyKind::MissingInDirectory,
            DiscrepancyKind::MissingInRegistry,
            DiscrepancyKind::AttributeMismatch,
        ]
    }
}

impl fmt::Display for DiscrepancyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a registry record was paired with its directory counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Key,
    Alias,
    Name,
}

/// One unit of drift for a single identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    /// Registry key when the registry side is known, else the directory key.
    pub key: IdentityKey,
    pub kind: DiscrepancyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_record: Option<CanonicalRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_record: Option<CanonicalRecord>,
    /// Non-empty for `AttributeMismatch`, empty otherwise.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub mismatched_fields: BTreeSet<String>,
    /// Set when both records are present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<MatchMethod>,
}

impl Discrepancy {
    fn missing_in_directory(record: &CanonicalRecord) -> Self {
        Self {
            key: record.key().clone(),
            kind: DiscrepancyKind::MissingInDirectory,
            registry_record: Some(record.clone()),
            directory_record: None,
            mismatched_fields: BTreeSet::new(),
            matched_by: None,
        }
    }

    fn missing_in_registry(record: &CanonicalRecord) -> Self {
        Self {
            key: record.key().clone(),
            kind: DiscrepancyKind::MissingInRegistry,
            registry_record: None,
            directory_record: Some(record.clone()),
            mismatched_fields: BTreeSet::new(),
            matched_by: None,
        }
    }

    /// The record that best describes the identity for display.
    #[must_use]
    pub fn primary_record(&self) -> Option<&CanonicalRecord> {
        self.registry_record
            .as_ref()
            .or(self.directory_record.as_ref())
    }
}

/// A registry identity paired with a directory record under a different key.
///
/// Exact-key pairs are implied by the shared key and are not listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    pub registry_key: IdentityKey,
    pub directory_key: IdentityKey,
    pub matched_by: MatchMethod,
}

/// Counters for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationStats {
    pub registry_total: usize,
    pub directory_total: usize,
    pub matched_by_key: usize,
    pub matched_by_alias: usize,
    pub matched_by_name: usize,
    /// Matched identities without any mismatched field.
    pub in_sync: usize,
    pub missing_in_directory: usize,
    pub missing_in_registry: usize,
    pub attribute_mismatch: usize,
}

impl ReconciliationStats {
    /// Registry records paired with a directory record by any method.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.matched_by_key + self.matched_by_alias + self.matched_by_name
    }

    #[must_use]
    pub fn count(&self, kind: DiscrepancyKind) -> usize {
        match kind {
            DiscrepancyKind::MissingInDirectory => self.missing_in_directory,
            DiscrepancyKind::MissingInRegistry => self.missing_in_registry,
            DiscrepancyKind::AttributeMismatch => self.attribute_mismatch,
        }
    }
}

/// Outcome of one run. Discrepancies are sorted by (kind, key), resolved
/// identities by registry key.
///
/// Every directory key shows up exactly once: as the key of a
/// `MissingInRegistry` discrepancy, as the `directory_key` of a resolved
/// identity, or as a registry key it was paired with exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub mode: SyncMode,
    pub discrepancies: Vec<Discrepancy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolved: Vec<ResolvedIdentity>,
    pub stats: ReconciliationStats,
}

impl ReconciliationResult {
    /// True when nothing needs to change in the directory.
    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.discrepancies.is_empty()
    }

    pub fn of_kind(&self, kind: DiscrepancyKind) -> impl Iterator<Item = &Discrepancy> {
        self.discrepancies.iter().filter(move |d| d.kind == kind)
    }
}

/// Shared engine for both sync modes.
#[derive(Debug, Clone)]
pub struct Reconciler {
    mode: SyncMode,
    profile: ModeProfile,
    name_matcher: Option<NameMatcher>,
}

impl Reconciler {
    #[must_use]
    pub fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            profile: mode.profile(),
            name_matcher: None,
        }
    }

    /// Pair still-unmatched records by display-name similarity.
    #[must_use]
    pub fn with_name_matching(mut self, threshold: f64) -> Self {
        self.name_matcher = Some(NameMatcher::new(threshold));
        self
    }

    #[must_use]
    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Compute the discrepancies between two complete snapshots.
    #[must_use]
    pub fn reconcile(&self, registry: &RegistrySet, directory: &DirectorySet) -> ReconciliationResult {
        let mut stats = ReconciliationStats {
            registry_total: registry.len(),
            directory_total: directory.len(),
            ..Default::default()
        };

        let pairs = self.pair(registry, directory);
        let claimed: BTreeSet<&IdentityKey> = pairs.values().map(|(d, _)| d.key()).collect();
        let resolved: Vec<ResolvedIdentity> = pairs
            .iter()
            .filter(|(_, (_, method))| *method != MatchMethod::Key)
            .map(|(key, (found, method))| ResolvedIdentity {
                registry_key: (*key).clone(),
                directory_key: found.key().clone(),
                matched_by: *method,
            })
            .collect();

        let mut discrepancies = Vec::new();
        for record in registry.records() {
            let Some((counterpart, method)) = pairs.get(record.key()) else {
                discrepancies.push(Discrepancy::missing_in_directory(record));
                continue;
            };

            match method {
                MatchMethod::Key => stats.matched_by_key += 1,
                MatchMethod::Alias => stats.matched_by_alias += 1,
                MatchMethod::Name => stats.matched_by_name += 1,
            }

            let fields = self.profile.mismatches(record, counterpart);
            if fields.is_empty() {
                stats.in_sync += 1;
                continue;
            }

            debug!(
                key = %record.key(),
                directory_key = %counterpart.key(),
                fields = ?fields,
                "Attribute mismatch"
            );
            discrepancies.push(Discrepancy {
                key: record.key().clone(),
                kind: DiscrepancyKind::AttributeMismatch,
                registry_record: Some(record.clone()),
                directory_record: Some((*counterpart).clone()),
                mismatched_fields: fields,
                matched_by: Some(*method),
            });
        }

        discrepancies.extend(
            directory
                .records()
                .filter(|r| !claimed.contains(r.key()))
                .map(Discrepancy::missing_in_registry),
        );

        discrepancies.sort_by(|a, b| (a.kind, &a.key).cmp(&(b.kind, &b.key)));

        for discrepancy in &discrepancies {
            match discrepancy.kind {
                DiscrepancyKind::MissingInDirectory => stats.missing_in_directory += 1,
                DiscrepancyKind::MissingInRegistry => stats.missing_in_registry += 1,
                DiscrepancyKind::AttributeMismatch => stats.attribute_mismatch += 1,
            }
        }

        info!(
            mode = %self.mode,
            registry_total = stats.registry_total,
            directory_total = stats.directory_total,
            matched = stats.matched(),
            in_sync = stats.in_sync,
            missing_in_directory = stats.missing_in_directory,
            missing_in_registry = stats.missing_in_registry,
            attribute_mismatch = stats.attribute_mismatch,
            "Reconciliation completed"
        );

        ReconciliationResult {
            mode: self.mode,
            discrepancies,
            resolved,
            stats,
        }
    }

    /// Resolve registry keys to directory records: exact keys first, then
    /// aliases, then (if enabled) names. A directory record is claimed once.
    fn pair<'a>(
        &self,
        registry: &'a RegistrySet,
        directory: &'a DirectorySet,
    ) -> BTreeMap<&'a IdentityKey, (&'a CanonicalRecord, MatchMethod)> {
        let mut pairs = BTreeMap::new();
        let mut claimed: BTreeSet<&IdentityKey> = BTreeSet::new();

        for record in registry.records() {
            if let Some(found) = directory.get(record.key().as_str()) {
                claimed.insert(found.key());
                pairs.insert(record.key(), (found, MatchMethod::Key));
            }
        }

        for record in registry.records() {
            if pairs.contains_key(record.key()) {
                continue;
            }
            let found = std::iter::once(record.key())
                .chain(record.aliases())
                .flat_map(|k| [directory.by_alias(k.as_str()), directory.get(k.as_str())])
                .flatten()
                .find(|d| !claimed.contains(d.key()));
            if let Some(found) = found {
                claimed.insert(found.key());
                pairs.insert(record.key(), (found, MatchMethod::Alias));
            }
        }

        if let Some(matcher) = &self.name_matcher {
            for record in registry.records() {
                if pairs.contains_key(record.key()) {
                    continue;
                }
                let candidates = directory.records().filter(|d| !claimed.contains(d.key()));
                if let Some(found) = matcher.best_match(record, candidates) {
                    debug!(
                        key = %record.key(),
                        directory_key = %found.key(),
                        "Matched by display name"
                    );
                    claimed.insert(found.key());
                    pairs.insert(record.key(), (found, MatchMethod::Name));
                }
            }
        }

        pairs
    }
}

/// Reconcile with exact-key and alias matching only.
#[must_use]
pub fn reconcile(
    registry: &RegistrySet,
    directory: &DirectorySet,
    mode: SyncMode,
) -> ReconciliationResult {
    Reconciler::new(mode).reconcile(registry, directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{Normalizer, NormalizerConfig};
    use crate::raw::{
        DirectoryMember, DirectoryName, DirectoryUser, RawRecord, RegistryMember, RegistryUser,
    };
    use crate::record::Source;
    use crate::snapshot::SnapshotBuilder;

    fn reg(email: &str, name: &str, account: bool) -> RawRecord {
        let (first, last) = name.split_once(' ').unwrap_or((name, ""));
        RawRecord::from(RegistryMember {
            user: Some(RegistryUser {
                email: Some(email.to_string()),
                first_name: Some(first.to_string()),
                last_name: Some(last.to_string()),
                gsuite_id: account.then(|| format!("{}@aegee-muenchen.de", first.to_lowercase())),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn group_member(email: &str, status: &str) -> RawRecord {
        RawRecord::from(DirectoryMember {
            email: Some(email.to_string()),
            status: Some(status.to_string()),
            group: Some("members@aegee-muenchen.de".into()),
            ..Default::default()
        })
    }

    fn user(email: &str, name: &str, org_unit: &str, suspended: bool) -> DirectoryUser {
        DirectoryUser {
            primary_email: Some(email.to_string()),
            name: Some(DirectoryName {
                full_name: Some(name.to_string()),
                ..Default::default()
            }),
            org_unit_path: Some(org_unit.to_string()),
            suspended,
            ..Default::default()
        }
    }

    fn snapshots(
        config: NormalizerConfig,
        registry: Vec<RawRecord>,
        directory: Vec<RawRecord>,
    ) -> (RegistrySet, DirectorySet) {
        let normalizer = Normalizer::new(config);
        (
            SnapshotBuilder::new(Source::Registry, &normalizer)
                .build(registry)
                .unwrap(),
            SnapshotBuilder::new(Source::Directory, &normalizer)
                .build(directory)
                .unwrap(),
        )
    }

    fn members_config() -> NormalizerConfig {
        NormalizerConfig::default().with_members_group("members@aegee-muenchen.de")
    }

    fn summary(result: &ReconciliationResult) -> Vec<(DiscrepancyKind, &str)> {
        result
            .discrepancies
            .iter()
            .map(|d| (d.kind, d.key.as_str()))
            .collect()
    }

    mod members_sync {
        use super::*;

        #[test]
        fn test_three_way_difference() {
            let (registry, directory) = snapshots(
                members_config(),
                vec![
                    reg("zoe@gmail.com", "Zoe Zed", false),
                    reg("alice@gmail.com", "Alice Smith", false),
                    reg("carl@gmail.com", "Carl Doe", true),
                ],
                vec![
                    group_member("carl@gmail.com", "SUSPENDED"),
                    group_member("bob@gmail.com", "ACTIVE"),
                    group_member("zoe@googlemail.com", "ACTIVE"),
                ],
            );

            let result = reconcile(&registry, &directory, SyncMode::MembersSync);
            assert_eq!(
                summary(&result),
                vec![
                    (DiscrepancyKind::MissingInDirectory, "alice@gmail.com"),
                    (DiscrepancyKind::MissingInRegistry, "bob@gmail.com"),
                    (DiscrepancyKind::AttributeMismatch, "carl@gmail.com"),
                ]
            );

            let mismatch = &result.discrepancies[2];
            assert_eq!(
                mismatch.mismatched_fields.iter().collect::<Vec<_>>(),
                vec!["status"]
            );
            assert_eq!(mismatch.matched_by, Some(MatchMethod::Key));

            assert_eq!(result.stats.registry_total, 3);
            assert_eq!(result.stats.directory_total, 3);
            assert_eq!(result.stats.matched_by_key, 2);
            assert_eq!(result.stats.in_sync, 1);
            assert_eq!(result.stats.count(DiscrepancyKind::MissingInDirectory), 1);
            assert_eq!(result.stats.count(DiscrepancyKind::MissingInRegistry), 1);
            assert_eq!(result.stats.count(DiscrepancyKind::AttributeMismatch), 1);
        }

        #[test]
        fn test_in_sync() {
            let (registry, directory) = snapshots(
                members_config(),
                vec![reg("dave@gmail.com", "Dave Jones", true)],
                vec![group_member("dave@gmail.com", "ACTIVE")],
            );

            let result = reconcile(&registry, &directory, SyncMode::MembersSync);
            assert!(result.is_in_sync());
            assert_eq!(result.stats.in_sync, 1);
            assert!(result.resolved.is_empty());
        }

        #[test]
        fn test_empty_snapshots() {
            let result = reconcile(
                &RegistrySet::empty(Source::Registry),
                &DirectorySet::empty(Source::Directory),
                SyncMode::MembersSync,
            );
            assert!(result.is_in_sync());
            assert_eq!(result.stats, ReconciliationStats::default());
        }
    }

    mod actives_sync {
        use super::*;

        fn actives_config() -> NormalizerConfig {
            NormalizerConfig::default().with_org_unit("/Members")
        }

        #[test]
        fn test_org_unit_and_status_mismatch() {
            let (registry, directory) = snapshots(
                actives_config(),
                vec![reg("erin@aegee-muenchen.de", "Erin Ray", true)],
                vec![user("erin@aegee-muenchen.de", "Erin Ray", "/Alumni", true).into()],
            );

            let result = reconcile(&registry, &directory, SyncMode::ActivesSync);
            assert_eq!(result.discrepancies.len(), 1);
            let fields: Vec<&String> = result.discrepancies[0].mismatched_fields.iter().collect();
            assert_eq!(fields, vec!["org_unit", "status"]);
        }

        #[test]
        fn test_alias_match_from_directory_emails() {
            let mut erin = user("erin.ray@aegee-muenchen.de", "Erin Ray", "/Members", false);
            erin.emails = vec![crate::raw::DirectoryEmail {
                address: Some("erin@gmail.com".into()),
                ..Default::default()
            }];

            let (registry, directory) = snapshots(
                actives_config(),
                vec![reg("erin@gmail.com", "Erin Ray", true)],
                vec![erin.into()],
            );

            let result = reconcile(&registry, &directory, SyncMode::ActivesSync);
            assert!(result.is_in_sync(), "{:?}", result.discrepancies);
            assert_eq!(result.stats.matched_by_alias, 1);
            assert_eq!(
                result.resolved,
                vec![ResolvedIdentity {
                    registry_key: IdentityKey::parse("erin@gmail.com").unwrap(),
                    directory_key: IdentityKey::parse("erin.ray@aegee-muenchen.de").unwrap(),
                    matched_by: MatchMethod::Alias,
                }]
            );
        }

        #[test]
        fn test_alias_match_from_registry_aliases() {
            let registry_raw = RawRecord::from(RegistryMember {
                user: Some(RegistryUser {
                    email: Some("finn@gmail.com".into()),
                    primary_email: Some("finn@aegee-muenchen.de".into()),
                    ..Default::default()
                }),
                ..Default::default()
            });

            let (registry, directory) = snapshots(
                NormalizerConfig::default(),
                vec![registry_raw],
                vec![user("finn@aegee-muenchen.de", "Finn", "/", false).into()],
            );

            let result = reconcile(&registry, &directory, SyncMode::ActivesSync);
            assert!(result.is_in_sync());
            assert_eq!(result.stats.matched_by_alias, 1);
        }

        #[test]
        fn test_exact_key_wins_over_alias() {
            let mut shared = user("gina@aegee-muenchen.de", "Gina", "/", false);
            shared.aliases = vec!["gina@gmail.com".into()];

            let (registry, directory) = snapshots(
                NormalizerConfig::default(),
                vec![
                    reg("gina@gmail.com", "Gina Old", false),
                    reg("gina@aegee-muenchen.de", "Gina", false),
                ],
                vec![shared.into()],
            );

            let result = reconcile(&registry, &directory, SyncMode::ActivesSync);
            assert_eq!(
                summary(&result),
                vec![(DiscrepancyKind::MissingInDirectory, "gina@gmail.com")]
            );
            assert_eq!(result.stats.matched_by_key, 1);
        }

        #[test]
        fn test_name_matching_only_when_enabled() {
            let (registry, directory) = snapshots(
                actives_config(),
                vec![reg("hugo@gmx.de", "Hugo Brandt", true)],
                vec![user("hugo.b@aegee-muenchen.de", "Hugo Brandt", "/Members", false).into()],
            );

            let plain = reconcile(&registry, &directory, SyncMode::ActivesSync);
            assert_eq!(
                summary(&plain),
                vec![
                    (DiscrepancyKind::MissingInDirectory, "hugo@gmx.de"),
                    (DiscrepancyKind::MissingInRegistry, "hugo.b@aegee-muenchen.de"),
                ]
            );

            assert!(plain.resolved.is_empty());

            let fuzzy = Reconciler::new(SyncMode::ActivesSync)
                .with_name_matching(0.9)
                .reconcile(&registry, &directory);
            assert!(fuzzy.is_in_sync());
            assert_eq!(fuzzy.stats.matched_by_name, 1);
            assert_eq!(fuzzy.stats.matched(), 1);
            assert_eq!(fuzzy.resolved.len(), 1);
            assert_eq!(fuzzy.resolved[0].directory_key.as_str(), "hugo.b@aegee-muenchen.de");
            assert_eq!(fuzzy.resolved[0].matched_by, MatchMethod::Name);
        }
    }

    #[test]
    fn test_result_is_deterministic() {
        let (registry, directory) = snapshots(
            members_config(),
            vec![
                reg("b@gmail.com", "B B", false),
                reg("a@gmail.com", "A A", false),
            ],
            vec![group_member("c@gmail.com", "ACTIVE"), group_member("d@gmail.com", "ACTIVE")],
        );

        let first = reconcile(&registry, &directory, SyncMode::MembersSync);
        let second = reconcile(&registry, &directory, SyncMode::MembersSync);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(
            summary(&first),
            vec![
                (DiscrepancyKind::MissingInDirectory, "a@gmail.com"),
                (DiscrepancyKind::MissingInDirectory, "b@gmail.com"),
                (DiscrepancyKind::MissingInRegistry, "c@gmail.com"),
                (DiscrepancyKind::MissingInRegistry, "d@gmail.com"),
            ]
        );
    }

    #[test]
    fn test_result_serialization() {
        let (registry, directory) = snapshots(
            members_config(),
            vec![reg("a@gmail.com", "A A", false)],
            vec![],
        );

        let result = reconcile(&registry, &directory, SyncMode::MembersSync);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["mode"], "members-sync");
        assert_eq!(json["discrepancies"][0]["kind"], "MISSING_IN_DIRECTORY");
        assert_eq!(json["discrepancies"][0]["key"], "a@gmail.com");
        assert!(json["discrepancies"][0].get("mismatched_fields").is_none());
        assert!(json.get("resolved").is_none());
        assert_eq!(json["stats"]["missing_in_directory"], 1);
    }

    #[test]
    fn test_discrepancy_kind_order() {
        let mut kinds = vec![
            DiscrepancyKind::AttributeMismatch,
            DiscrepancyKind::MissingInRegistry,
            DiscrepancyKind::MissingInDirectory,
        ];
        kinds.sort();
        assert_eq!(kinds, DiscrepancyKind::all().to_vec());
    }
}
