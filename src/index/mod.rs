//! Similarity index over historical feedback
//!
//! The index answers "which past feedback entries describe products most
//! like this one". Production deployments typically point this seam at an
//! external vector database; [`EmbeddingIndex`] is the bundled in-memory
//! implementation.

pub mod vector;

pub use vector::EmbeddingIndex;

use crate::error::Result;
use crate::types::FeedbackEntry;
use async_trait::async_trait;

/// One scored hit from a similarity lookup
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub entry: FeedbackEntry,
    /// Cosine similarity to the query, in [0, 1]
    pub similarity: f32,
}

/// Nearest-neighbor lookup seam over the feedback log
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Up to `top_k` most similar corrective entries, descending similarity
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredEntry>>;

    /// Add a feedback entry to the index
    async fn insert(&self, entry: &FeedbackEntry) -> Result<()>;
}
