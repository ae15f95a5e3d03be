//! Resolver configuration
//!
//! The similarity tiers, cache lifetime, and feedback window are
//! configuration rather than hard invariants. They live in an explicit
//! struct passed to the resolver's constructor, never read ad hoc from
//! process-wide settings, so tests can substitute their own tiers.

use crate::error::{Result, TariffsenseError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunable parameters for the classification resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Minimum similarity for a feedback entry to count as a semantic
    /// match at all; also the anchor of the confidence curve
    pub semantic_threshold: f32,

    /// Similarity at which a semantic match is trusted ahead of the
    /// primary classifier, with primary candidates kept as backup
    pub high_threshold: f32,

    /// Similarity at which a semantic match fully replaces the primary
    /// classifier's answer
    pub very_high_threshold: f32,

    /// Nearest neighbors requested from the similarity index per lookup
    pub semantic_top_k: usize,

    /// Feedback history window consulted by the resolver, in days
    pub window_days: i64,

    /// How long a loaded feedback snapshot is served before reloading
    #[serde(with = "serde_duration")]
    pub cache_ttl: Duration,

    /// Leading code digits that identify a top-level code family
    pub code_family_width: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            semantic_threshold: 0.50,
            high_threshold: 0.70,
            very_high_threshold: 0.80,
            semantic_top_k: 10,
            window_days: 30,
            cache_ttl: Duration::from_secs(300), // 5 minutes
            code_family_width: 2,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: ResolverConfig = toml::from_str(toml_str)
            .map_err(|e| TariffsenseError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.semantic_threshold)
            || !(0.0..=1.0).contains(&self.high_threshold)
            || !(0.0..=1.0).contains(&self.very_high_threshold)
        {
            return Err(TariffsenseError::Config(
                "similarity thresholds must be within [0.0, 1.0]".to_string(),
            ));
        }

        if self.semantic_threshold > self.high_threshold
            || self.high_threshold > self.very_high_threshold
        {
            return Err(TariffsenseError::Config(
                "thresholds must satisfy semantic <= high <= very_high".to_string(),
            ));
        }

        if self.semantic_top_k == 0 || self.semantic_top_k > 100 {
            return Err(TariffsenseError::Config(
                "semantic_top_k must be between 1 and 100".to_string(),
            ));
        }

        if self.window_days < 1 {
            return Err(TariffsenseError::Config(
                "window_days must be at least 1".to_string(),
            ));
        }

        if self.cache_ttl < Duration::from_secs(1) || self.cache_ttl > Duration::from_secs(86_400)
        {
            return Err(TariffsenseError::Config(
                "cache_ttl must be between 1 second and 24 hours".to_string(),
            ));
        }

        if self.code_family_width == 0 || self.code_family_width > 6 {
            return Err(TariffsenseError::Config(
                "code_family_width must be between 1 and 6".to_string(),
            ));
        }

        Ok(())
    }
}

// Custom serde module for Duration (serialize/deserialize as seconds)
mod serde_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
