//! Engine configuration loading
//!
//! Configuration is read from a TOML file when present and falls back to
//! compiled defaults otherwise, so a missing config file is never fatal.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Policy applied when the similarity step finds a candidate at or above
/// the duplicate threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityPolicy {
    /// Treat the candidate as the same entity and return it (no new row).
    #[default]
    AutoMerge,
    /// Log the candidate for review but create a new entity anyway.
    FlagOnly,
}

/// Tunable parameters for the resolution engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum fuzzy-match score at which two names are treated as the
    /// same entity. Values >= 1.0 disable the similarity step entirely.
    pub similarity_threshold: f64,

    /// What to do with a similarity match: merge silently or flag it.
    pub similarity_policy: SimilarityPolicy,

    /// Number of normalized keys per batch lookup query. Kept well under
    /// SQLite's default bind-parameter ceiling (999).
    pub batch_chunk_size: usize,

    /// Maximum candidate rows fetched for one similarity comparison.
    pub candidate_limit: i64,

    /// Normalized-key prefix length used to select similarity candidates
    /// via the index.
    pub candidate_prefix_len: usize,

    /// Time-to-live for cached entity-type and relation-type rows, in
    /// seconds.
    pub type_cache_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            similarity_policy: SimilarityPolicy::AutoMerge,
            batch_chunk_size: 100,
            candidate_limit: 200,
            candidate_prefix_len: 3,
            type_cache_ttl_secs: 300,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No engine config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        if config.batch_chunk_size == 0 {
            return Err(Error::Config(
                "batch_chunk_size must be greater than zero".to_string(),
            ));
        }
        // Values above 1.0 are legal (they disable fuzzy matching); only
        // negative thresholds are nonsense.
        if config.similarity_threshold < 0.0 {
            return Err(Error::Config(format!(
                "similarity_threshold out of range: {}",
                config.similarity_threshold
            )));
        }

        tracing::info!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert_eq!(config.similarity_threshold, 0.85);
        assert_eq!(config.batch_chunk_size, 100);
        assert_eq!(config.similarity_policy, SimilarityPolicy::AutoMerge);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = EngineConfig::load(Path::new("/nonexistent/entilink.toml")).unwrap();
        assert_eq!(config.batch_chunk_size, 100);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entilink.toml");
        std::fs::write(&path, "similarity_threshold = 0.9\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.similarity_threshold, 0.9);
        assert_eq!(config.batch_chunk_size, 100);
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entilink.toml");
        std::fs::write(&path, "batch_chunk_size = 0\n").unwrap();

        assert!(EngineConfig::load(&path).is_err());
    }
}
