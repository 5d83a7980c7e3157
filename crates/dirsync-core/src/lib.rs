//! Directory reconciliation core for AEGEE-München.
//!
//! Compares the membership registry (MyAEGEE) with the Google Workspace
//! directory and reports what an operator has to change in the directory.
//! Nothing here performs I/O: clients hand over raw records, this crate
//! returns an ordered list of discrepancies.
//!
//! # Pipeline
//!
//! - [`Normalizer`] maps raw records onto [`CanonicalRecord`]s keyed by [`IdentityKey`]
//! - [`SnapshotBuilder`] assembles one [`Snapshot`] per source, rejecting duplicates
//! - [`Reconciler`] diffs the two snapshots for a [`SyncMode`]
//!
//! # Example
//!
//! ```
//! use dirsync_core::{
//!     reconcile, DirectoryMember, DiscrepancyKind, Normalizer, RawRecord, RegistryMember,
//!     RegistryUser, SnapshotBuilder, Source, SyncMode,
//! };
//!
//! # fn main() -> Result<(), dirsync_core::ReconcileError> {
//! let normalizer = Normalizer::default();
//!
//! let registry = SnapshotBuilder::new(Source::Registry, &normalizer).build([
//!     RawRecord::from(RegistryMember {
//!         user: Some(RegistryUser {
//!             email: Some("alice@gmail.com".into()),
//!             ..Default::default()
//!         }),
//!         ..Default::default()
//!     }),
//! ])?;
//! let directory = SnapshotBuilder::new(Source::Directory, &normalizer).build([
//!     RawRecord::from(DirectoryMember {
//!         email: Some("bob@gmail.com".into()),
//!         status: Some("ACTIVE".into()),
//!         ..Default::default()
//!     }),
//! ])?;
//!
//! let result = reconcile(&registry, &directory, SyncMode::MembersSync);
//! assert_eq!(result.discrepancies[0].kind, DiscrepancyKind::MissingInDirectory);
//! assert_eq!(result.discrepancies[1].kind, DiscrepancyKind::MissingInRegistry);
//! # Ok(())
//! # }
//! ```

mod correlation;
mod error;
mod key;
mod mode;
mod normalizer;
mod raw;
mod reconciler;
mod record;
mod snapshot;

pub use correlation::{NameMatcher, DEFAULT_NAME_THRESHOLD};
pub use error::{ReconcileError, ReconcileResult};
pub use key::{default_domain_aliases, IdentityKey};
pub use mode::{ModeProfile, ParseSyncModeError, SyncMode, FIELD_STATUS};
pub use normalizer::{Normalizer, NormalizerConfig};
pub use raw::{
    DirectoryEmail, DirectoryMember, DirectoryName, DirectoryUser, RawRecord, RegistryMember,
    RegistryUser,
};
pub use reconciler::{
    reconcile, Discrepancy, DiscrepancyKind, MatchMethod, ReconciliationResult,
    ReconciliationStats, Reconciler, ResolvedIdentity,
};
pub use record::{
    CanonicalRecord, CanonicalRecordBuilder, ParseStatusError, Source, Status, ATTR_ACTIVE,
    ATTR_DISPLAY_NAME, ATTR_GROUP, ATTR_ORG_UNIT,
};
pub use snapshot::{build, DirectorySet, RegistrySet, Snapshot, SnapshotBuilder};
