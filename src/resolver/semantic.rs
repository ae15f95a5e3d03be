//! Semantic-match resolution against the similarity index
//!
//! Finds historical corrections for products similar to the query and
//! scores each with a confidence derived from its similarity. When the
//! accelerated index is down, degrades to embedding the cached feedback
//! entries directly and comparing by cosine similarity, so the resolver
//! never reports "no matches" merely because an index happens to be
//! unreachable.

use crate::config::ResolverConfig;
use crate::embeddings::{cosine_similarity, TextEmbedder};
use crate::feedback::FeedbackCache;
use crate::index::{ScoredEntry, SimilarityIndex};
use crate::types::SemanticMatch;
use std::sync::Arc;
use tracing::{debug, warn};

/// Confidence at the base similarity threshold
const BASE_CONFIDENCE: f32 = 70.0;

/// Ceiling for semantic confidence; 95%+ is reserved for exact matches
const MAX_SEMANTIC_CONFIDENCE: f32 = 95.0;

/// Resolves semantically similar historical corrections
pub struct SemanticMatchResolver {
    index: Arc<dyn SimilarityIndex>,
    cache: Arc<FeedbackCache>,
    embedder: Arc<dyn TextEmbedder>,
    semantic_threshold: f32,
    window_days: i64,
}

impl SemanticMatchResolver {
    pub fn new(
        index: Arc<dyn SimilarityIndex>,
        cache: Arc<FeedbackCache>,
        embedder: Arc<dyn TextEmbedder>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            index,
            cache,
            embedder,
            semantic_threshold: config.semantic_threshold,
            window_days: config.window_days,
        }
    }

    /// Up to `top_k` corrective matches with similarity at or above
    /// `floor`, descending similarity.
    ///
    /// `floor` is normally the configured semantic threshold; the
    /// resolver's last-ditch fallback passes 0.0 to accept any match at
    /// all. The confidence curve stays anchored at the configured
    /// threshold either way, so sub-threshold matches score below 70.
    pub async fn find_matches(
        &self,
        description: &str,
        top_k: usize,
        floor: f32,
    ) -> Vec<SemanticMatch> {
        let hits = match self.index.query(description, top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(
                    "Similarity index unavailable, falling back to brute-force comparison: {}",
                    e
                );
                self.brute_force(description, top_k).await
            }
        };

        let mut matches: Vec<SemanticMatch> = hits
            .into_iter()
            .filter(|hit| hit.entry.is_correction())
            .filter(|hit| hit.similarity >= floor)
            .map(|hit| {
                let similarity = hit.similarity.clamp(0.0, 1.0);
                SemanticMatch {
                    description: hit.entry.description,
                    predicted_code: hit.entry.predicted_code,
                    correct_code: hit.entry.correct_code,
                    similarity_score: similarity,
                    timestamp: hit.entry.timestamp,
                    confidence: self.confidence_for(similarity),
                }
            })
            .collect();

        matches.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);

        debug!(
            "Found {} semantic matches at or above similarity {:.2}",
            matches.len(),
            floor
        );
        matches
    }

    /// Confidence scales linearly from 70 at the configured threshold,
    /// capped below the 95%+ reserved for exact matches.
    fn confidence_for(&self, similarity: f32) -> f32 {
        (BASE_CONFIDENCE + (similarity - self.semantic_threshold) * 100.0)
            .min(MAX_SEMANTIC_CONFIDENCE)
    }

    /// Embed the query and every cached corrective description, compare
    /// directly. Entries whose embedding fails are skipped.
    async fn brute_force(&self, description: &str, top_k: usize) -> Vec<ScoredEntry> {
        let query_embedding = match self.embedder.embed(description).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Brute-force fallback failed to embed query: {}", e);
                return Vec::new();
            }
        };

        let entries = self.cache.get_recent(self.window_days).await;
        debug!(
            "Brute-force comparing query against {} cached feedback entries",
            entries.len()
        );

        let mut hits = Vec::new();
        for entry in entries.into_iter().filter(|e| e.is_correction()) {
            match self.embedder.embed(&entry.description).await {
                Ok(embedding) => {
                    let similarity =
                        cosine_similarity(&query_embedding, &embedding).clamp(0.0, 1.0);
                    hits.push(ScoredEntry { entry, similarity });
                }
                Err(e) => {
                    debug!(
                        "Skipping entry '{}' in brute-force comparison: {}",
                        entry.description, e
                    );
                }
            }
        }

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;
    use crate::error::{Result, TariffsenseError};
    use crate::feedback::{FeedbackStore, InMemoryFeedbackStore};
    use crate::index::EmbeddingIndex;
    use crate::types::FeedbackEntry;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::time::Duration as StdDuration;

    struct DownIndex;

    #[async_trait]
    impl SimilarityIndex for DownIndex {
        async fn query(&self, _text: &str, _top_k: usize) -> Result<Vec<ScoredEntry>> {
            Err(TariffsenseError::Index("index is down".to_string()))
        }

        async fn insert(&self, _entry: &FeedbackEntry) -> Result<()> {
            Err(TariffsenseError::Index("index is down".to_string()))
        }
    }

    fn correction(description: &str, predicted: &str, correct: &str) -> FeedbackEntry {
        FeedbackEntry::new(description, predicted, correct, Utc::now()).unwrap()
    }

    async fn cache_with(entries: Vec<FeedbackEntry>) -> Arc<FeedbackCache> {
        let store = Arc::new(InMemoryFeedbackStore::new());
        for entry in &entries {
            store.append(entry).await.unwrap();
        }
        Arc::new(FeedbackCache::new(store, StdDuration::from_secs(300)))
    }

    fn config() -> ResolverConfig {
        ResolverConfig::default()
    }

    #[tokio::test]
    async fn test_confidence_curve() {
        let cache = cache_with(vec![]).await;
        let resolver = SemanticMatchResolver::new(
            Arc::new(EmbeddingIndex::new(Arc::new(HashEmbedder::new()))),
            cache,
            Arc::new(HashEmbedder::new()),
            &config(),
        );

        // 70 at the threshold, linear above it, capped at 95
        assert!((resolver.confidence_for(0.50) - 70.0).abs() < 1e-4);
        assert!((resolver.confidence_for(0.60) - 80.0).abs() < 1e-4);
        assert!((resolver.confidence_for(0.75) - 95.0).abs() < 1e-4);
        assert!((resolver.confidence_for(0.95) - 95.0).abs() < 1e-4);
        // Sub-threshold similarities score below the base
        assert!(resolver.confidence_for(0.30) < 70.0);
    }

    #[tokio::test]
    async fn test_index_path_filters_threshold_and_sorts() {
        let embedder = Arc::new(HashEmbedder::new());
        let index = Arc::new(EmbeddingIndex::new(embedder.clone()));
        index
            .insert(&correction("leather handbag with strap", "4205", "4202"))
            .await
            .unwrap();
        index
            .insert(&correction("industrial welding robot", "8515", "8428"))
            .await
            .unwrap();

        let cache = cache_with(vec![]).await;
        let resolver = SemanticMatchResolver::new(index, cache, embedder, &config());

        let matches = resolver.find_matches("leather handbag", 10, 0.50).await;
        assert!(!matches.is_empty());
        assert!(matches
            .windows(2)
            .all(|w| w[0].similarity_score >= w[1].similarity_score));
        assert!(matches.iter().all(|m| m.similarity_score >= 0.50));
        assert_eq!(matches[0].correct_code, "4202");
    }

    #[tokio::test]
    async fn test_brute_force_fallback_when_index_down() {
        let cache = cache_with(vec![
            correction("leather handbag", "4205", "4202"),
            correction("confirmed sweater", "6110", "6110"),
        ])
        .await;

        let resolver = SemanticMatchResolver::new(
            Arc::new(DownIndex),
            cache,
            Arc::new(HashEmbedder::new()),
            &config(),
        );

        let matches = resolver.find_matches("leather handbag", 10, 0.50).await;
        assert_eq!(matches.len(), 1);
        assert!(matches[0].similarity_score > 0.99);
        assert_eq!(matches[0].correct_code, "4202");
    }

    #[tokio::test]
    async fn test_zero_floor_accepts_weak_matches() {
        let cache = cache_with(vec![correction("industrial welding robot", "8515", "8428")])
            .await;

        let resolver = SemanticMatchResolver::new(
            Arc::new(DownIndex),
            cache,
            Arc::new(HashEmbedder::new()),
            &config(),
        );

        let strict = resolver.find_matches("leather handbag", 10, 0.50).await;
        assert!(strict.is_empty());

        let any = resolver.find_matches("leather handbag", 10, 0.0).await;
        assert_eq!(any.len(), 1);
        assert!(any[0].confidence < 70.0);
    }

    #[tokio::test]
    async fn test_empty_cache_and_down_index_yields_nothing() {
        let cache = cache_with(vec![]).await;
        let resolver = SemanticMatchResolver::new(
            Arc::new(DownIndex),
            cache,
            Arc::new(HashEmbedder::new()),
            &config(),
        );

        assert!(resolver.find_matches("anything", 10, 0.0).await.is_empty());
    }
}
