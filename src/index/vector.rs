//! In-memory embedding index
//!
//! Brute-force nearest-neighbor search over embedded feedback
//! descriptions. Linear scan per query, which is fine at feedback-log
//! scale (thousands of entries); larger deployments substitute an
//! external index behind the same trait.

use crate::embeddings::{cosine_similarity, TextEmbedder};
use crate::error::Result;
use crate::index::{ScoredEntry, SimilarityIndex};
use crate::types::FeedbackEntry;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// In-memory vector index over feedback entries
pub struct EmbeddingIndex {
    embedder: Arc<dyn TextEmbedder>,
    entries: RwLock<Vec<(FeedbackEntry, Vec<f32>)>>,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Number of indexed entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop the current contents and re-index the corrective entries of a
    /// full feedback log. Returns how many entries were indexed.
    pub async fn rebuild(&self, entries: &[FeedbackEntry]) -> Result<usize> {
        let mut indexed = Vec::new();
        for entry in entries.iter().filter(|e| e.is_correction()) {
            let embedding = self.embedder.embed(&entry.description).await?;
            indexed.push((entry.clone(), embedding));
        }

        let count = indexed.len();
        *self.entries.write().await = indexed;

        info!("Rebuilt embedding index with {} corrective entries", count);
        Ok(count)
    }
}

#[async_trait]
impl SimilarityIndex for EmbeddingIndex {
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredEntry>> {
        let query_embedding = self.embedder.embed(text).await?;

        let entries = self.entries.read().await;
        let mut hits: Vec<ScoredEntry> = entries
            .iter()
            .filter(|(entry, _)| entry.is_correction())
            .map(|(entry, embedding)| ScoredEntry {
                entry: entry.clone(),
                similarity: cosine_similarity(&query_embedding, embedding).clamp(0.0, 1.0),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        debug!("Embedding index query returned {} hits", hits.len());
        Ok(hits)
    }

    async fn insert(&self, entry: &FeedbackEntry) -> Result<()> {
        let embedding = self.embedder.embed(&entry.description).await?;
        self.entries.write().await.push((entry.clone(), embedding));

        debug!(
            "Indexed feedback entry: {} -> {}",
            entry.predicted_code, entry.correct_code
        );
        Ok(())
    }
}
