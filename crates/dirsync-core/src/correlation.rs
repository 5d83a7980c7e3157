//! Display-name correlation for identities that share no email address.

use strsim::normalized_levenshtein;

use crate::record::{CanonicalRecord, ATTR_DISPLAY_NAME};

/// Default similarity needed to pair two records by name.
pub const DEFAULT_NAME_THRESHOLD: f64 = 0.9;

/// Pairs records by display-name similarity.
#[derive(Debug, Clone, Copy)]
pub struct NameMatcher {
    threshold: f64,
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_THRESHOLD)
    }
}

impl NameMatcher {
    /// Threshold is clamped to `0.0..=1.0`.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_nan() {
            DEFAULT_NAME_THRESHOLD
        } else {
            threshold.clamp(0.0, 1.0)
        };
        Self { threshold }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Normalized Levenshtein similarity of two names (0.0 to 1.0).
    #[must_use]
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let a = normalize(a);
        let b = normalize(b);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        normalized_levenshtein(&a, &b)
    }

    /// Best candidate for `record`, by similarity then key.
    ///
    /// Records without a display name never match.
    pub fn best_match<'a, I>(&self, record: &CanonicalRecord, candidates: I) -> Option<&'a CanonicalRecord>
    where
        I: IntoIterator<Item = &'a CanonicalRecord>,
    {
        let name = record.attribute(ATTR_DISPLAY_NAME)?;

        let mut best: Option<(f64, &'a CanonicalRecord)> = None;
        for candidate in candidates {
            let Some(other) = candidate.attribute(ATTR_DISPLAY_NAME) else {
                continue;
            };
            let score = self.similarity(name, other);
            if score < self.threshold {
                continue;
            }
            best = match best {
                Some((best_score, current))
                    if best_score > score
                        || (best_score == score && current.key() <= candidate.key()) =>
                {
                    Some((best_score, current))
                }
                _ => Some((score, candidate)),
            };
        }
        best.map(|(_, record)| record)
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
