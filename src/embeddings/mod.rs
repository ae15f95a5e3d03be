//! Embedding generation for semantic similarity
//!
//! Provides the embedding seam used by the brute-force fallback of the
//! semantic matcher, plus two implementations: a remote HTTP service and
//! a deterministic local hashing embedder for offline use and tests.

pub mod local;
pub mod remote;

pub use local::{HashEmbedder, HASH_EMBEDDING_DIM};
pub use remote::{RemoteEmbedder, REMOTE_EMBEDDING_DIM};

use crate::error::Result;
use async_trait::async_trait;

/// Text embedding seam
///
/// Used directly only when the accelerated similarity index is down and
/// the semantic matcher falls back to comparing cached feedback entries
/// one by one.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embedding dimensionality
    fn dimensions(&self) -> usize;
}

/// Calculate cosine similarity between two vectors
///
/// Mismatched lengths and zero-norm vectors compare as 0.0 rather than
/// erroring or dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
