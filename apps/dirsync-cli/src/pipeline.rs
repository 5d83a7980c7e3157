//! Fetch both sides, build the snapshots and reconcile them.

use tracing::{info, instrument};

use dirsync_core::{
    Normalizer, RawRecord, ReconciliationResult, Reconciler, RegistryMember, SnapshotBuilder,
    Source, SyncMode,
};

use crate::config::Config;
use crate::error::CliResult;
use crate::sources::{DirectorySource, RegistrySource};

/// Name of the directory side as shown in reports.
pub fn directory_label(mode: SyncMode, config: &Config) -> String {
    match mode {
        SyncMode::MembersSync => config.sync.members_group.clone(),
        SyncMode::ActivesSync => "G-Suite".to_string(),
    }
}

async fn fetch_directory(
    mode: SyncMode,
    config: &Config,
    directory: &dyn DirectorySource,
) -> CliResult<Vec<RawRecord>> {
    let records = match mode {
        SyncMode::MembersSync => directory
            .group_members(&config.sync.members_group)
            .await?
            .into_iter()
            .map(RawRecord::from)
            .collect(),
        SyncMode::ActivesSync => directory
            .users(config.sync.actives_group.as_slice())
            .await?
            .into_iter()
            .map(RawRecord::from)
            .collect(),
    };
    Ok(records)
}

/// Fetch both snapshots concurrently and reconcile them.
#[instrument(skip_all, fields(mode = %mode))]
pub async fn run(
    mode: SyncMode,
    config: &Config,
    registry: &dyn RegistrySource,
    directory: &dyn DirectorySource,
) -> CliResult<ReconciliationResult> {
    let (registry_records, directory_records) =
        tokio::try_join!(registry.members(), fetch_directory(mode, config, directory))?;
    info!(
        registry = registry_records.len(),
        directory = directory_records.len(),
        "Fetched both snapshots"
    );
    reconcile_records(mode, config, registry_records, directory_records)
}

/// Build the snapshots from already fetched records and reconcile them.
pub fn reconcile_records(
    mode: SyncMode,
    config: &Config,
    registry: Vec<RegistryMember>,
    directory: Vec<RawRecord>,
) -> CliResult<ReconciliationResult> {
    let normalizer = Normalizer::new(config.normalizer_config(mode));

    let registry = SnapshotBuilder::new(Source::Registry, &normalizer)
        .build(registry.into_iter().map(RawRecord::from))?;
    let directory = SnapshotBuilder::new(Source::Directory, &normalizer)
        .exclude(&config.sync.excluded)
        .build(directory)?;

    let mut reconciler = Reconciler::new(mode);
    if let Some(threshold) = config.name_threshold(mode) {
        reconciler = reconciler.with_name_matching(threshold);
    }
    Ok(reconciler.reconcile(&registry, &directory))
}
