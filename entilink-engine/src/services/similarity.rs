//! Fuzzy similarity between normalized keys
//!
//! The scorer is an always-present capability injected at construction.
//! When fuzzy matching is disabled the [`NoopScorer`] satisfies the same
//! trait, so resolution code never branches on availability.

use strsim::normalized_levenshtein;

/// Score raised to at least this value when one key contains the other
const CONTAINMENT_FLOOR: f64 = 0.85;

/// Minimum key length (chars) for the containment boost to apply
const CONTAINMENT_MIN_LEN: usize = 4;

/// Fuzzy-match capability over normalized comparison keys
pub trait SimilarityScorer: Send + Sync {
    /// Similarity of two normalized keys, in [0, 1].
    ///
    /// Inputs shorter than 2 characters always score 0; no match is
    /// attempted on near-empty strings.
    fn score(&self, a: &str, b: &str) -> f64;

    /// Whether two keys should be treated as the same identity.
    /// The threshold boundary is inclusive.
    fn is_likely_duplicate(&self, a: &str, b: &str, threshold: f64) -> bool {
        self.score(a, b) >= threshold
    }
}

/// Character-level similarity via normalized Levenshtein distance, with
/// a containment boost: one key being a substring of the other is strong
/// evidence of identity ("gummersbach" inside "stadtgummersbach").
#[derive(Debug, Clone, Copy, Default)]
pub struct StrsimScorer;

impl SimilarityScorer for StrsimScorer {
    fn score(&self, a: &str, b: &str) -> f64 {
        let (len_a, len_b) = (a.chars().count(), b.chars().count());
        if len_a < 2 || len_b < 2 {
            return 0.0;
        }

        let base = normalized_levenshtein(a, b);

        if len_a >= CONTAINMENT_MIN_LEN
            && len_b >= CONTAINMENT_MIN_LEN
            && (a.contains(b) || b.contains(a))
        {
            return base.max(CONTAINMENT_FLOOR);
        }

        base
    }
}

/// Disabled fuzzy matching: scores everything 0, so nothing ever crosses
/// a positive threshold and resolution degrades to exact-match-or-create.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScorer;

impl SimilarityScorer for NoopScorer {
    fn score(&self, _a: &str, _b: &str) -> f64 {
        0.0
    }
}
