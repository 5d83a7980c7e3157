//! Identity keys shared by both snapshots.
//!
//! An `IdentityKey` is the join column of a reconciliation run. It is always
//! trimmed, lowercased and non-empty, so two spellings of the same mailbox in
//! the registry and the directory compare equal.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ReconcileError, ReconcileResult};

/// Normalized identity of one person across both sources.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Parse a raw identity value (usually an email address).
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::InvalidKey` if nothing is left after trimming.
    pub fn parse(raw: &str) -> ReconcileResult<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ReconcileError::InvalidKey(format!(
                "empty identity value '{raw}'"
            )));
        }
        Ok(Self(normalized))
    }

    /// Rewrite the domain part through a domain alias table.
    ///
    /// `googlemail.com` and `gmail.com` deliver to the same mailbox; folding
    /// one onto the other keeps both spellings on one key.
    #[must_use]
    pub fn fold_domain(self, aliases: &BTreeMap<String, String>) -> Self {
        let Some((local, domain)) = self.0.rsplit_once('@') else {
            return self;
        };
        match aliases.get(domain) {
            Some(canonical) if !local.is_empty() => {
                Self(format!("{local}@{}", canonical.trim().to_lowercase()))
            }
            _ => self,
        }
    }

    /// The local part of an email-shaped key, or the whole key otherwise.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.rsplit_once('@').map_or(self.0.as_str(), |(l, _)| l)
    }

    /// The domain of an email-shaped key.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.0.rsplit_once('@').map(|(_, d)| d)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for IdentityKey {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IdentityKey {
    type Error = ReconcileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IdentityKey> for String {
    fn from(key: IdentityKey) -> Self {
        key.0
    }
}

impl AsRef<str> for IdentityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for IdentityKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Default domain alias table: `googlemail.com` is folded onto `gmail.com`.
#[must_use]
pub fn default_domain_aliases() -> BTreeMap<String, String> {
    BTreeMap::from([("googlemail.com".to_string(), "gmail.com".to_string())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_lowercases() {
        let key = IdentityKey::parse("  Alice.Smith@Example.ORG \n").unwrap();
        assert_eq!(key.as_str(), "alice.smith@example.org");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(IdentityKey::parse("").is_err());
        assert!(IdentityKey::parse("   \t").is_err());
    }

    #[test]
    fn test_fold_domain_alias() {
        let aliases = default_domain_aliases();
        let key = IdentityKey::parse("bob@GoogleMail.com")
            .unwrap()
            .fold_domain(&aliases);
        assert_eq!(key.as_str(), "bob@gmail.com");

        let untouched = IdentityKey::parse("bob@aegee-muenchen.de")
            .unwrap()
            .fold_domain(&aliases);
        assert_eq!(untouched.as_str(), "bob@aegee-muenchen.de");
    }

    #[test]
    fn test_fold_domain_without_at_sign() {
        let key = IdentityKey::parse("12345").unwrap().fold_domain(&default_domain_aliases());
        assert_eq!(key.as_str(), "12345");
        assert_eq!(key.local_part(), "12345");
        assert!(key.domain().is_none());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut keys = vec![
            IdentityKey::parse("carol@x.org").unwrap(),
            IdentityKey::parse("alice@x.org").unwrap(),
            IdentityKey::parse("bob@x.org").unwrap(),
        ];
        keys.sort();
        let ordered: Vec<&str> = keys.iter().map(IdentityKey::as_str).collect();
        assert_eq!(ordered, vec!["alice@x.org", "bob@x.org", "carol@x.org"]);
    }

    #[test]
    fn test_serde_roundtrip_normalizes() {
        let key: IdentityKey = serde_json::from_str("\"Dave@X.org\"").unwrap();
        assert_eq!(key.as_str(), "dave@x.org");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"dave@x.org\"");
        assert!(serde_json::from_str::<IdentityKey>("\"  \"").is_err());
    }
}
