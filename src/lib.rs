//! Tariffsense - Feedback-Driven Tariff Classification
//!
//! A classification resolver for multi-level hierarchical commodity codes
//! that progressively improves from user corrections:
//! - Exact and semantic recall of historical corrections
//! - Priority-tiered resolution with explainable ordering
//! - Pattern-based confidence adjustment of primary classifier output
//! - Time-bounded feedback caching, consistent under concurrent writes
//!
//! # Architecture
//!
//! The crate is organized into several layers:
//! - **Types**: Value types (FeedbackEntry, ClassificationResult, etc.)
//! - **Feedback**: Append-only log stores and the read-through cache
//! - **Embeddings / Index**: Similarity machinery behind trait seams
//! - **Resolver**: The priority state machine tying it all together
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tariffsense::{
//!     ClassificationResolver, EmbeddingIndex, FeedbackCache, HashEmbedder,
//!     ResolverConfig, SqliteFeedbackStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ResolverConfig::default();
//!     let store = Arc::new(SqliteFeedbackStore::open("feedback.db")?);
//!     let embedder = Arc::new(HashEmbedder::new());
//!     let index = Arc::new(EmbeddingIndex::new(embedder.clone()));
//!     let cache = Arc::new(FeedbackCache::new(store.clone(), config.cache_ttl));
//!
//!     let resolver = ClassificationResolver::new(
//!         config, store, index, my_primary_classifier, embedder, cache,
//!     )?;
//!
//!     let results = resolver.classify("genuine leather handbag", 3).await?;
//!
//!     // The user corrects the suggestion; the next lookup learns from it
//!     resolver.submit_correction("genuine leather handbag", "4205", "4202").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod feedback;
pub mod index;
pub mod resolver;
pub mod types;

// Re-export commonly used types
pub use classifier::{CodeCatalog, CodeInfo, PrimaryClassifier};
pub use config::ResolverConfig;
pub use embeddings::{
    cosine_similarity, HashEmbedder, RemoteEmbedder, TextEmbedder, HASH_EMBEDDING_DIM,
    REMOTE_EMBEDDING_DIM,
};
pub use error::{Result, TariffsenseError};
pub use feedback::{FeedbackCache, FeedbackStore, InMemoryFeedbackStore, SqliteFeedbackStore};
pub use index::{EmbeddingIndex, ScoredEntry, SimilarityIndex};
pub use resolver::{
    ClassificationResolver, ExactMatchResolver, PatternAdjuster, SemanticMatchResolver,
    DEFAULT_TOP_K,
};
pub use types::{
    code_family, CandidateCode, ClassificationResult, CorrectionAnalysis, CorrectionKind,
    CorrectionSeverity, FamilyCorrectionCount, FeedbackEntry, FeedbackStats, MatchType,
    ResultSource, SemanticMatch,
};
