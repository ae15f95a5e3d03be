//! Priority-tiered classification resolution
//!
//! The resolver decides, in a fixed and explainable order, whether to
//! trust an exact historical correction, a semantically similar one, a
//! pattern-based confidence adjustment, or the unmodified primary
//! classifier output:
//!
//! 1. exact feedback match (terminal)
//! 2. very-high semantic match, replacing the primary answer
//! 3. high semantic match leading, with primary candidates as backup
//! 4. medium semantic match tempering the primary answer's confidence
//! 5. primary classifier, then a last-ditch semantic lookup below the
//!    configured threshold, then an empty list
//!
//! Exact recall is maximally trustworthy (a human confirmed that precise
//! description); weak similarity only tempers, never replaces; and a weak
//! analogy beats silence.

pub mod adjust;
pub mod exact;
pub mod semantic;

pub use adjust::PatternAdjuster;
pub use exact::ExactMatchResolver;
pub use semantic::SemanticMatchResolver;

use crate::classifier::{CodeCatalog, CodeInfo, PrimaryClassifier};
use crate::config::ResolverConfig;
use crate::embeddings::TextEmbedder;
use crate::error::{Result, TariffsenseError};
use crate::feedback::{FeedbackCache, FeedbackStore};
use crate::index::SimilarityIndex;
use crate::resolver::exact::normalize_description;
use crate::types::{
    code_family, ClassificationResult, CorrectionAnalysis, FamilyCorrectionCount, FeedbackEntry,
    FeedbackStats, MatchType, ResultSource, SemanticMatch,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default number of results returned by `classify`
pub const DEFAULT_TOP_K: usize = 3;

/// Confidence assigned to exact feedback matches
const EXACT_MATCH_CONFIDENCE: f32 = 95.0;

/// Ceiling for very-high-tier semantic results
const VERY_HIGH_CONFIDENCE_CAP: f32 = 98.0;

/// Bonus added to very-high-tier semantic confidence
const VERY_HIGH_CONFIDENCE_BONUS: f32 = 5.0;

/// Penalty and floor for medium-tier semantic fallback results
const MEDIUM_FALLBACK_PENALTY: f32 = 5.0;
const MEDIUM_FALLBACK_FLOOR: f32 = 70.0;

/// Penalty and floor for last-ditch fallback results
const FALLBACK_PENALTY: f32 = 10.0;
const FALLBACK_FLOOR: f32 = 65.0;

/// Primary candidates kept behind a high-tier semantic result
const HIGH_TIER_BACKUP_LIMIT: usize = 2;

/// Families reported by `get_stats`
const TOP_FAMILY_LIMIT: usize = 5;

/// Semantic tier a result was produced under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SemanticTier {
    VeryHigh,
    High,
    Medium,
    Fallback,
}

/// Feedback-enhanced classification orchestrator
///
/// Read paths (`classify`, `get_stats`) are safe to call concurrently
/// without external locking; `submit_correction` serializes its
/// append-then-invalidate sequence internally.
pub struct ClassificationResolver {
    config: ResolverConfig,
    store: Arc<dyn FeedbackStore>,
    index: Arc<dyn SimilarityIndex>,
    classifier: Arc<dyn PrimaryClassifier>,
    catalog: Option<Arc<dyn CodeCatalog>>,
    cache: Arc<FeedbackCache>,
    exact: ExactMatchResolver,
    semantic: SemanticMatchResolver,
    adjuster: PatternAdjuster,
    write_guard: Mutex<()>,
}

impl ClassificationResolver {
    /// Wire up a resolver from its collaborators.
    ///
    /// The cache is injected rather than constructed here so tests and
    /// multi-resolver processes can control it (and its clock) directly.
    pub fn new(
        config: ResolverConfig,
        store: Arc<dyn FeedbackStore>,
        index: Arc<dyn SimilarityIndex>,
        classifier: Arc<dyn PrimaryClassifier>,
        embedder: Arc<dyn TextEmbedder>,
        cache: Arc<FeedbackCache>,
    ) -> Result<Self> {
        config.validate()?;

        let exact = ExactMatchResolver::new(cache.clone());
        let semantic =
            SemanticMatchResolver::new(index.clone(), cache.clone(), embedder, &config);
        let adjuster = PatternAdjuster::new(config.code_family_width);

        Ok(Self {
            config,
            store,
            index,
            classifier,
            catalog: None,
            cache,
            exact,
            semantic,
            adjuster,
            write_guard: Mutex::new(()),
        })
    }

    /// Attach a reference catalog for enriching feedback-derived results
    pub fn with_catalog(mut self, catalog: Arc<dyn CodeCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Classify a product description.
    ///
    /// Returns up to `top_k` suggestions ordered by trust tier and
    /// confidence. Never fails for "no result"; that is an empty list, and
    /// the only error is an empty description.
    pub async fn classify(
        &self,
        description: &str,
        top_k: usize,
    ) -> Result<Vec<ClassificationResult>> {
        let description = description.trim();
        if description.is_empty() {
            return Err(TariffsenseError::InvalidInput(
                "description must not be empty".to_string(),
            ));
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        debug!("Classifying '{}' (top_k: {})", description, top_k);

        // 1. Exact feedback match
        if let Some(entry) = self
            .exact
            .find_exact(description, self.config.window_days)
            .await
        {
            info!(
                "Exact feedback match: returning learned correction {}",
                entry.correct_code
            );
            return Ok(vec![self.build_exact_result(&entry).await]);
        }

        // 2-4. Semantic tiers
        let matches = self
            .semantic
            .find_matches(
                description,
                self.config.semantic_top_k,
                self.config.semantic_threshold,
            )
            .await;

        if let Some(best) = matches.first() {
            if best.similarity_score >= self.config.very_high_threshold {
                info!(
                    "Very-high semantic match ({:.1}%), replacing primary answer",
                    best.similarity_score * 100.0
                );
                let result = self
                    .build_semantic_result(description, best, SemanticTier::VeryHigh)
                    .await;
                return Ok(vec![result]);
            }

            if best.similarity_score >= self.config.high_threshold {
                info!(
                    "High semantic match ({:.1}%), leading with it",
                    best.similarity_score * 100.0
                );
                let semantic_result = self
                    .build_semantic_result(description, best, SemanticTier::High)
                    .await;

                let primary = self
                    .primary_results(description, top_k.saturating_sub(1))
                    .await;
                if primary.is_empty() {
                    debug!("Primary classifier returned nothing, semantic match stands alone");
                }

                let mut results = vec![semantic_result];
                results.extend(primary.into_iter().take(HIGH_TIER_BACKUP_LIMIT));
                return Ok(results);
            }

            // Medium: temper the primary answer, never replace it
            info!(
                "Medium semantic match ({:.1}%), tempering primary confidence",
                best.similarity_score * 100.0
            );
            let primary = self.primary_results(description, top_k).await;
            if !primary.is_empty() {
                let adjusted = self.adjuster.adjust(primary, &matches);
                return Ok(sort_by_confidence(adjusted));
            }

            debug!("Primary classifier returned nothing, serving medium match as fallback");
            let result = self
                .build_semantic_result(description, best, SemanticTier::Medium)
                .await;
            return Ok(vec![result]);
        }

        // 5. Primary classifier as the fallback of record
        let primary = self.primary_results(description, top_k).await;
        if !primary.is_empty() {
            let adjusted = self.adjuster.adjust(primary, &[]);
            return Ok(sort_by_confidence(adjusted));
        }

        // Last ditch: any semantic match at all, however weak
        let weak = self
            .semantic
            .find_matches(description, self.config.semantic_top_k, 0.0)
            .await;
        if let Some(best) = weak.first() {
            info!(
                "No primary results; serving weak semantic fallback ({:.1}% similarity)",
                best.similarity_score * 100.0
            );
            let result = self
                .build_semantic_result(description, best, SemanticTier::Fallback)
                .await;
            return Ok(vec![result]);
        }

        debug!("No classification possible for '{}'", description);
        Ok(Vec::new())
    }

    /// Record a user correction (or confirmation) and make it visible to
    /// subsequent `classify` calls.
    ///
    /// Appends to the feedback store, inserts into the similarity index
    /// when corrective, and invalidates the cache. The sequence is
    /// serialized so a later `classify` never sees a cache older than a
    /// completed submission.
    pub async fn submit_correction(
        &self,
        description: &str,
        predicted_code: &str,
        correct_code: &str,
    ) -> Result<()> {
        let entry = FeedbackEntry::new(description, predicted_code, correct_code, Utc::now())?;

        let _guard = self.write_guard.lock().await;

        self.store.append(&entry).await?;

        let index_result = if entry.is_correction() {
            let analysis = CorrectionAnalysis::analyze(
                predicted_code,
                correct_code,
                self.config.code_family_width,
            );
            info!(
                "Correction recorded: {} -> {} ({:?}, severity {:?})",
                predicted_code, correct_code, analysis.kind, analysis.severity
            );
            self.index.insert(&entry).await
        } else {
            debug!(
                "Confirmatory entry for {} logged, index insert skipped",
                correct_code
            );
            Ok(())
        };

        // The append landed, so the cache must be invalidated even when
        // the index insert failed
        self.cache.invalidate().await;

        index_result?;
        Ok(())
    }

    /// Read-only aggregate over the recent feedback window
    pub async fn get_stats(&self, window_days: i64) -> Result<FeedbackStats> {
        if window_days < 1 {
            return Err(TariffsenseError::InvalidInput(
                "window_days must be at least 1".to_string(),
            ));
        }

        let entries = self.cache.get_recent(window_days).await;
        let total_entries = entries.len();

        let mut correction_count = 0usize;
        let mut family_counts: HashMap<String, usize> = HashMap::new();
        for entry in &entries {
            if entry.is_correction() {
                correction_count += 1;
                let family =
                    code_family(&entry.predicted_code, self.config.code_family_width).to_string();
                *family_counts.entry(family).or_insert(0) += 1;
            }
        }

        let mut top_corrected_code_families: Vec<FamilyCorrectionCount> = family_counts
            .into_iter()
            .map(|(family, count)| FamilyCorrectionCount { family, count })
            .collect();
        top_corrected_code_families
            .sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.family.cmp(&b.family)));
        top_corrected_code_families.truncate(TOP_FAMILY_LIMIT);

        let correction_rate = if total_entries > 0 {
            correction_count as f32 / total_entries as f32
        } else {
            0.0
        };

        Ok(FeedbackStats {
            total_entries,
            correction_count,
            correction_rate,
            top_corrected_code_families,
        })
    }

    /// Primary classifier output as standard results. Collaborator
    /// failures degrade to an empty list.
    async fn primary_results(&self, description: &str, top_k: usize) -> Vec<ClassificationResult> {
        if top_k == 0 {
            return Vec::new();
        }

        match self.classifier.classify(description, top_k).await {
            Ok(candidates) => candidates
                .into_iter()
                .map(ClassificationResult::from_candidate)
                .collect(),
            Err(e) => {
                warn!("Primary classifier unavailable: {}", e);
                Vec::new()
            }
        }
    }

    async fn build_exact_result(&self, entry: &FeedbackEntry) -> ClassificationResult {
        let info = self.lookup_code(&entry.correct_code).await;

        ClassificationResult {
            code: entry.correct_code.clone(),
            description: info.description,
            confidence: EXACT_MATCH_CONFIDENCE,
            rate: info.rate,
            units: info.units,
            source: ResultSource::ExactFeedback,
            match_type: MatchType::ExactMatch,
            similarity_score: Some(1.0),
            feedback_adjusted: false,
            learning_explanation: Some(format!(
                "This result comes from an exact correction previously recorded for \"{}\".",
                entry.description
            )),
        }
    }

    async fn build_semantic_result(
        &self,
        query: &str,
        m: &SemanticMatch,
        tier: SemanticTier,
    ) -> ClassificationResult {
        // An exact textual duplicate surfacing through the semantic path
        // is promoted to an exact-feedback result
        if normalize_description(&m.description) == normalize_description(query) {
            let info = self.lookup_code(&m.correct_code).await;
            return ClassificationResult {
                code: m.correct_code.clone(),
                description: info.description,
                confidence: EXACT_MATCH_CONFIDENCE,
                rate: info.rate,
                units: info.units,
                source: ResultSource::ExactFeedback,
                match_type: MatchType::ExactMatch,
                similarity_score: Some(1.0),
                feedback_adjusted: false,
                learning_explanation: Some(format!(
                    "This result comes from an exact correction previously recorded for \"{}\".",
                    m.description
                )),
            };
        }

        let info = self.lookup_code(&m.correct_code).await;
        let similarity_pct = m.similarity_score * 100.0;
        let excerpt = truncate_chars(&m.description, 60);

        let (match_type, confidence, explanation) = match tier {
            SemanticTier::VeryHigh => (
                MatchType::AiPerfectMatch,
                (m.confidence + VERY_HIGH_CONFIDENCE_BONUS).min(VERY_HIGH_CONFIDENCE_CAP),
                format!(
                    "Found a virtually identical product (similarity: {:.1}%): \"{}\"",
                    similarity_pct, excerpt
                ),
            ),
            SemanticTier::High => (
                MatchType::AiSmartMatch,
                m.confidence,
                format!(
                    "Found a very similar product (similarity: {:.1}%): \"{}\"",
                    similarity_pct, excerpt
                ),
            ),
            SemanticTier::Medium => (
                MatchType::AiSimilarMatch,
                (m.confidence - MEDIUM_FALLBACK_PENALTY).max(MEDIUM_FALLBACK_FLOOR),
                format!(
                    "Found a similar product (similarity: {:.1}%): \"{}\"",
                    similarity_pct, excerpt
                ),
            ),
            SemanticTier::Fallback => (
                MatchType::AiFallbackMatch,
                (m.confidence - FALLBACK_PENALTY).max(FALLBACK_FLOOR),
                format!(
                    "Weak similarity match (similarity: {:.1}%): \"{}\" - primary classifier returned no results",
                    similarity_pct, excerpt
                ),
            ),
        };

        debug!(
            "Built semantic result: {} with {:.1}% confidence ({})",
            m.correct_code, confidence, match_type
        );

        ClassificationResult {
            code: m.correct_code.clone(),
            description: info.description,
            confidence,
            rate: info.rate,
            units: info.units,
            source: ResultSource::SemanticFeedback,
            match_type,
            similarity_score: Some(m.similarity_score),
            feedback_adjusted: false,
            learning_explanation: Some(explanation),
        }
    }

    async fn lookup_code(&self, code: &str) -> CodeInfo {
        if let Some(catalog) = &self.catalog {
            match catalog.lookup(code).await {
                Ok(Some(info)) => return info,
                Ok(None) => debug!("Code {} not found in reference catalog", code),
                Err(e) => warn!("Reference catalog unavailable: {}", e),
            }
        }
        CodeInfo::placeholder(code)
    }
}

fn sort_by_confidence(mut results: Vec<ClassificationResult>) -> Vec<ClassificationResult> {
    results.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
