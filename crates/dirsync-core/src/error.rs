//! Error types for snapshot construction and reconciliation.
//!
//! Both variants describe local data-quality problems in one of the two
//! snapshots. They abort the run: skipping a record would hide exactly the
//! discrepancy an operator is looking for.

use thiserror::Error;

use crate::key::IdentityKey;
use crate::raw::RawRecord;
use crate::record::Source;

/// Result type alias using `ReconcileError`.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors raised while normalizing records and building snapshots.
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    /// A raw record has no derivable identity (or the wrong shape for its source).
    #[error("Malformed {origin} record: {reason}")]
    MalformedRecord {
        origin: Source,
        reason: String,
        record: Box<RawRecord>,
    },

    /// Two raw records of the same source collapse onto one identity key.
    #[error("Duplicate {origin} identity '{key}'")]
    DuplicateKey {
        key: IdentityKey,
        origin: Source,
        first: Box<RawRecord>,
        second: Box<RawRecord>,
    },

    /// A string could not be turned into an identity key.
    #[error("Invalid identity key: {0}")]
    InvalidKey(String),
}

impl ReconcileError {
    /// Create a malformed-record error.
    pub fn malformed(origin: Source, reason: impl Into<String>, record: &RawRecord) -> Self {
        Self::MalformedRecord {
            origin,
            reason: reason.into(),
            record: Box::new(record.clone()),
        }
    }

    /// The identity key involved, when the error concerns a single key.
    #[must_use]
    pub fn key(&self) -> Option<&IdentityKey> {
        match self {
            Self::DuplicateKey { key, .. } => Some(key),
            _ => None,
        }
    }

    /// The offending raw records, for operator inspection.
    #[must_use]
    pub fn records(&self) -> Vec<&RawRecord> {
        match self {
            Self::MalformedRecord { record, .. } => vec![record.as_ref()],
            Self::DuplicateKey { first, second, .. } => vec![first.as_ref(), second.as_ref()],
            Self::InvalidKey(_) => Vec::new(),
        }
    }
}
