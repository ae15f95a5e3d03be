//! Primary classifier and reference catalog seams
//!
//! The primary classification engine and the hierarchical code reference
//! database live outside this crate; the resolver consumes them through
//! these traits.

use crate::error::Result;
use crate::types::CandidateCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Primary classification engine seam
///
/// Given a product description, returns ranked candidate codes. The
/// resolver treats a failure here like an empty result set and degrades;
/// it never propagates classifier errors to the caller.
#[async_trait]
pub trait PrimaryClassifier: Send + Sync {
    async fn classify(&self, description: &str, top_k: usize) -> Result<Vec<CandidateCode>>;
}

/// Reference metadata for one code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeInfo {
    pub description: String,
    pub rate: String,
    pub units: Vec<String>,
}

impl CodeInfo {
    /// Placeholder used when the catalog has no entry for a learned code
    pub fn placeholder(code: &str) -> Self {
        Self {
            description: format!("Tariff code {}", code),
            rate: "Contact for rate".to_string(),
            units: Vec::new(),
        }
    }
}

/// Hierarchical code reference lookup seam
///
/// Optional: feedback-derived results are enriched with catalog metadata
/// when a catalog is wired in, and fall back to placeholders when it is
/// absent or misses.
#[async_trait]
pub trait CodeCatalog: Send + Sync {
    async fn lookup(&self, code: &str) -> Result<Option<CodeInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_info() {
        let info = CodeInfo::placeholder("4202.21");
        assert_eq!(info.description, "Tariff code 4202.21");
        assert_eq!(info.rate, "Contact for rate");
        assert!(info.units.is_empty());
    }
}
