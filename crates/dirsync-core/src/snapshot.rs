//! Snapshot builder.
//!
//! Turns a whole-population batch of raw records from one source into a
//! keyed [`Snapshot`]. Duplicate identities are an error, never merged.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::error::{ReconcileError, ReconcileResult};
use crate::key::IdentityKey;
use crate::normalizer::Normalizer;
use crate::raw::RawRecord;
use crate::record::{CanonicalRecord, Source};

/// Point-in-time materialization of one source's population.
#[derive(Debug, Clone)]
pub struct Snapshot {
    source: Source,
    records: BTreeMap<IdentityKey, CanonicalRecord>,
    alias_index: BTreeMap<IdentityKey, IdentityKey>,
}

/// Snapshot of the membership registry.
pub type RegistrySet = Snapshot;

/// Snapshot of the directory.
pub type DirectorySet = Snapshot;

impl Snapshot {
    /// An empty snapshot for `source`.
    #[must_use]
    pub fn empty(source: Source) -> Self {
        Self {
            source,
            records: BTreeMap::new(),
            alias_index: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn source(&self) -> Source {
        self.source
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by its primary key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CanonicalRecord> {
        self.records.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Look up the record owning `alias` as a secondary key.
    #[must_use]
    pub fn by_alias(&self, alias: &str) -> Option<&CanonicalRecord> {
        self.alias_index
            .get(alias)
            .and_then(|key| self.records.get(key))
    }

    /// Records in key order.
    pub fn records(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.records.values()
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.records.keys()
    }
}

/// Builds a [`Snapshot`] from raw records.
#[derive(Debug)]
pub struct SnapshotBuilder<'a> {
    source: Source,
    normalizer: &'a Normalizer,
    excluded: BTreeSet<IdentityKey>,
}

impl<'a> SnapshotBuilder<'a> {
    #[must_use]
    pub fn new(source: Source, normalizer: &'a Normalizer) -> Self {
        Self {
            source,
            normalizer,
            excluded: BTreeSet::new(),
        }
    }

    /// Drop records whose key or any alias is one of these addresses (role
    /// accounts and the like).
    ///
    /// Values are normalized like identities; blank values are ignored.
    #[must_use]
    pub fn exclude<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded.extend(
            keys.into_iter()
                .filter_map(|k| self.normalizer.key(k.as_ref()).ok()),
        );
        self
    }

    /// Normalize every record and assemble the snapshot.
    ///
    /// # Errors
    ///
    /// Fails with `MalformedRecord` on the first record without a usable
    /// identity and with `DuplicateKey` when two records share a key.
    pub fn build<I>(self, records: I) -> ReconcileResult<Snapshot>
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut seen: BTreeMap<IdentityKey, (CanonicalRecord, RawRecord)> = BTreeMap::new();

        for raw in records {
            let record = self.normalizer.normalize(&raw, self.source)?;
            match seen.entry(record.key().clone()) {
                Entry::Occupied(existing) => {
                    return Err(ReconcileError::DuplicateKey {
                        key: existing.key().clone(),
                        origin: self.source,
                        first: Box::new(existing.get().1.clone()),
                        second: Box::new(raw),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert((record, raw));
                }
            }
        }

        let total = seen.len();
        let primary_keys: BTreeSet<IdentityKey> = seen.keys().cloned().collect();
        let records: BTreeMap<IdentityKey, CanonicalRecord> = seen
            .into_iter()
            .filter(|(_, (record, _))| !self.is_excluded(record))
            .map(|(key, (record, _))| (key, record))
            .collect();

        let alias_index = self.index_aliases(&records, &primary_keys);

        debug!(
            source = %self.source,
            total = total,
            excluded = total - records.len(),
            aliases = alias_index.len(),
            "Built snapshot"
        );

        Ok(Snapshot {
            source: self.source,
            records,
            alias_index,
        })
    }

    fn is_excluded(&self, record: &CanonicalRecord) -> bool {
        self.excluded.contains(record.key())
            || record.aliases().iter().any(|alias| self.excluded.contains(alias))
    }

    fn index_aliases(
        &self,
        records: &BTreeMap<IdentityKey, CanonicalRecord>,
        primary_keys: &BTreeSet<IdentityKey>,
    ) -> BTreeMap<IdentityKey, IdentityKey> {
        let mut claims: BTreeMap<&IdentityKey, BTreeSet<&IdentityKey>> = BTreeMap::new();
        for record in records.values() {
            for alias in record.aliases() {
                if !primary_keys.contains(alias) {
                    claims.entry(alias).or_default().insert(record.key());
                }
            }
        }

        let mut index = BTreeMap::new();
        for (alias, owners) in claims {
            if owners.len() > 1 {
                warn!(
                    source = %self.source,
                    alias = %alias,
                    owners = ?owners.iter().map(|k| k.as_str()).collect::<Vec<_>>(),
                    "Ambiguous alias ignored"
                );
                continue;
            }
            if let Some(owner) = owners.into_iter().next() {
                index.insert(alias.clone(), owner.clone());
            }
        }
        index
    }
}

/// Build a snapshot with the default normalizer and no exclusions.
///
/// # Errors
///
/// See [`SnapshotBuilder::build`].
pub fn build<I>(records: I, source: Source) -> ReconcileResult<Snapshot>
where
    I: IntoIterator<Item = RawRecord>,
{
    SnapshotBuilder::new(source, &Normalizer::default()).build(records)
}
