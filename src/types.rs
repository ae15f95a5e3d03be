//! Core data types for the tariffsense classification system
//!
//! This module defines the value types flowing through the resolver:
//! feedback entries, semantic matches, classification results, and the
//! correction-severity analysis used when a user submits a correction.
//! Fields are validated once, at construction, so the rest of the crate
//! never handles half-formed records.

use crate::error::{Result, TariffsenseError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Width of the heading prefix used by correction-severity analysis.
/// Tariff schedules put the four leading digits on the heading level.
const HEADING_WIDTH: usize = 4;

/// Leading prefix of a hierarchical code identifying its top-level family.
///
/// Falls back to the whole code when it is shorter than the requested width.
pub fn code_family(code: &str, width: usize) -> &str {
    code.get(..width).unwrap_or(code)
}

/// A single feedback record: what the user classified, what the system
/// predicted, and what the user says is correct.
///
/// Immutable once appended to a [`FeedbackStore`](crate::feedback::FeedbackStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    /// Product description as the user entered it
    pub description: String,

    /// Code the classifier predicted
    pub predicted_code: String,

    /// Code the user confirmed as correct
    pub correct_code: String,

    /// When the feedback was submitted
    pub timestamp: DateTime<Utc>,
}

impl FeedbackEntry {
    /// Create a validated feedback entry.
    ///
    /// All three text fields must be non-blank; stores use this constructor
    /// when reading rows back so a malformed row is rejected here rather
    /// than surfacing deep inside the resolver.
    pub fn new(
        description: impl Into<String>,
        predicted_code: impl Into<String>,
        correct_code: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let description = description.into();
        let predicted_code = predicted_code.into();
        let correct_code = correct_code.into();

        if description.trim().is_empty() {
            return Err(TariffsenseError::InvalidInput(
                "feedback description must not be empty".to_string(),
            ));
        }
        if predicted_code.trim().is_empty() || correct_code.trim().is_empty() {
            return Err(TariffsenseError::InvalidInput(
                "feedback codes must not be empty".to_string(),
            ));
        }

        Ok(Self {
            description,
            predicted_code,
            correct_code,
            timestamp,
        })
    }

    /// A correction is an entry where the user overrode the prediction.
    /// Only corrections participate in semantic matching and pattern
    /// adjustment; confirmatory entries are kept for accuracy statistics.
    pub fn is_correction(&self) -> bool {
        self.predicted_code != self.correct_code
    }
}

/// A semantically similar historical correction, scored against the
/// current query. Constructed per lookup, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticMatch {
    /// Description of the historical product
    pub description: String,

    /// Code originally predicted for it
    pub predicted_code: String,

    /// Code the user corrected it to
    pub correct_code: String,

    /// Cosine similarity to the current query, in [0, 1]
    pub similarity_score: f32,

    /// When the historical feedback was recorded
    pub timestamp: DateTime<Utc>,

    /// Derived confidence percentage, in [0, 100]
    pub confidence: f32,
}

/// Ranked candidate returned by the primary classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCode {
    pub code: String,
    pub description: String,

    /// Classifier confidence percentage, in [0, 100]
    pub confidence: f32,

    /// Duty rate display string
    pub rate: String,

    /// Units of quantity for the code
    pub units: Vec<String>,
}

/// Where a classification result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    /// Unmodified primary classifier output
    Standard,

    /// Exact historical correction for this description
    ExactFeedback,

    /// Semantically similar historical correction
    SemanticFeedback,
}

impl std::fmt::Display for ResultSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultSource::Standard => write!(f, "standard"),
            ResultSource::ExactFeedback => write!(f, "exact_feedback"),
            ResultSource::SemanticFeedback => write!(f, "semantic_feedback"),
        }
    }
}

/// How a result was matched against feedback history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// No feedback involvement
    None,

    /// Byte-for-byte (normalized) description match
    ExactMatch,

    /// Very-high-similarity semantic match
    AiPerfectMatch,

    /// High-similarity semantic match
    AiSmartMatch,

    /// Medium-similarity semantic match served because the primary
    /// classifier returned nothing
    AiSimilarMatch,

    /// Below-threshold semantic match served as a last resort
    AiFallbackMatch,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::None => write!(f, "none"),
            MatchType::ExactMatch => write!(f, "exact_match"),
            MatchType::AiPerfectMatch => write!(f, "ai_perfect_match"),
            MatchType::AiSmartMatch => write!(f, "ai_smart_match"),
            MatchType::AiSimilarMatch => write!(f, "ai_similar_match"),
            MatchType::AiFallbackMatch => write!(f, "ai_fallback_match"),
        }
    }
}

/// One ranked classification suggestion returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Suggested hierarchical code
    pub code: String,

    /// Description of the code (from the reference catalog when available)
    pub description: String,

    /// Confidence percentage, in [0, 100]
    pub confidence: f32,

    /// Duty rate display string
    pub rate: String,

    /// Units of quantity
    pub units: Vec<String>,

    /// Provenance of the suggestion
    pub source: ResultSource,

    /// Feedback match tier that produced the suggestion
    pub match_type: MatchType,

    /// Similarity to the historical match, when feedback was involved.
    /// Always 1.0 for exact-feedback results.
    pub similarity_score: Option<f32>,

    /// Whether pattern adjustment reduced this result's confidence
    pub feedback_adjusted: bool,

    /// Display-ready explanation of how feedback influenced the result
    pub learning_explanation: Option<String>,
}

impl ClassificationResult {
    /// Wrap a primary classifier candidate as an unmodified standard result.
    pub fn from_candidate(candidate: CandidateCode) -> Self {
        Self {
            code: candidate.code,
            description: candidate.description,
            confidence: candidate.confidence,
            rate: candidate.rate,
            units: candidate.units,
            source: ResultSource::Standard,
            match_type: MatchType::None,
            similarity_score: None,
            feedback_adjusted: false,
            learning_explanation: None,
        }
    }
}

/// Severity of a user correction, by how far up the hierarchy it reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionSeverity {
    High,
    Medium,
    Low,
}

/// Structural kind of a user correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionKind {
    /// Top-level code family changed
    FamilyChange,

    /// Same family, different heading
    HeadingChange,

    /// Same heading, finer subdivision changed
    SubheadingChange,
}

/// Analysis of how severe a correction was, logged on every submission
/// and used by reporting surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionAnalysis {
    pub kind: CorrectionKind,
    pub severity: CorrectionSeverity,
    pub from_family: String,
    pub to_family: String,
}

impl CorrectionAnalysis {
    /// Classify a correction by the highest hierarchy level it crosses.
    pub fn analyze(predicted_code: &str, correct_code: &str, family_width: usize) -> Self {
        let from_family = code_family(predicted_code, family_width).to_string();
        let to_family = code_family(correct_code, family_width).to_string();

        let (kind, severity) = if from_family != to_family {
            (CorrectionKind::FamilyChange, CorrectionSeverity::High)
        } else if code_family(predicted_code, HEADING_WIDTH)
            != code_family(correct_code, HEADING_WIDTH)
        {
            (CorrectionKind::HeadingChange, CorrectionSeverity::Medium)
        } else {
            (CorrectionKind::SubheadingChange, CorrectionSeverity::Low)
        };

        Self {
            kind,
            severity,
            from_family,
            to_family,
        }
    }

    pub fn is_family_change(&self) -> bool {
        matches!(self.kind, CorrectionKind::FamilyChange)
    }
}

/// Correction count for one code family, used in feedback statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyCorrectionCount {
    pub family: String,
    pub count: usize,
}

/// Aggregate view of recent feedback, for reporting surfaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    /// All entries in the window, corrections and confirmations alike
    pub total_entries: usize,

    /// Entries where the user overrode the prediction
    pub correction_count: usize,

    /// `correction_count / total_entries`, 0.0 for an empty window
    pub correction_rate: f32,

    /// Most-corrected predicted-code families, descending count
    pub top_corrected_code_families: Vec<FamilyCorrectionCount>,
}
