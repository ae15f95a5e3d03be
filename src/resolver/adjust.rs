//! Pattern-based confidence adjustment
//!
//! When similar products were historically corrected *away* from a code
//! family, primary results in that family get their confidence reduced in
//! proportion to how many such corrections exist and how similar they
//! are. The adjustment is a penalty only: it never raises confidence, so
//! a handful of look-alike corrections cannot amplify noise.

use crate::types::{code_family, ClassificationResult, SemanticMatch};
use tracing::debug;

/// Largest confidence reduction a single result can receive
const MAX_REDUCTION: f32 = 30.0;

/// Floor for adjusted confidence
const MIN_ADJUSTED_CONFIDENCE: f32 = 10.0;

/// Per-correction weight in the reduction formula
const REDUCTION_PER_CORRECTION: f32 = 10.0;

/// Applies correction-pattern penalties to primary classifier results
pub struct PatternAdjuster {
    family_width: usize,
}

impl PatternAdjuster {
    pub fn new(family_width: usize) -> Self {
        Self { family_width }
    }

    /// Adjust each result against the given semantic matches. With no
    /// matches this is the identity function.
    pub fn adjust(
        &self,
        results: Vec<ClassificationResult>,
        matches: &[SemanticMatch],
    ) -> Vec<ClassificationResult> {
        results
            .into_iter()
            .map(|result| self.adjust_one(result, matches))
            .collect()
    }

    fn adjust_one(
        &self,
        mut result: ClassificationResult,
        matches: &[SemanticMatch],
    ) -> ClassificationResult {
        let result_family = code_family(&result.code, self.family_width);

        let mut correction_count = 0usize;
        let mut total_similarity = 0.0f32;

        for m in matches {
            let predicted_family = code_family(&m.predicted_code, self.family_width);
            let correct_family = code_family(&m.correct_code, self.family_width);

            // Only cross-family corrections out of this result's family count
            if predicted_family == result_family && predicted_family != correct_family {
                correction_count += 1;
                total_similarity += m.similarity_score;
            }
        }

        if correction_count == 0 {
            return result;
        }

        let avg_similarity = total_similarity / correction_count as f32;
        let reduction =
            (correction_count as f32 * REDUCTION_PER_CORRECTION * avg_similarity).min(MAX_REDUCTION);

        let original = result.confidence;
        result.confidence = (original - reduction)
            .max(MIN_ADJUSTED_CONFIDENCE)
            .min(original);
        result.feedback_adjusted = true;
        result.learning_explanation = Some(format!(
            "Confidence adjusted based on {} similar product correction(s) away from code family {} (avg. similarity: {:.0}%)",
            correction_count,
            result_family,
            avg_similarity * 100.0
        ));

        debug!(
            "Pattern adjustment on {}: {:.1} -> {:.1} ({} corrections, avg similarity {:.2})",
            result.code, original, result.confidence, correction_count, avg_similarity
        );

        result
    }
}
