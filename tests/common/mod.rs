//! Shared fakes and fixtures for resolver integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tariffsense::{
    CandidateCode, FeedbackEntry, PrimaryClassifier, Result, ScoredEntry, SimilarityIndex,
    TariffsenseError,
};
use tokio::sync::RwLock;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn correction(description: &str, predicted: &str, correct: &str) -> FeedbackEntry {
    FeedbackEntry::new(description, predicted, correct, Utc::now()).unwrap()
}

pub fn correction_days_ago(
    description: &str,
    predicted: &str,
    correct: &str,
    days_ago: i64,
) -> FeedbackEntry {
    FeedbackEntry::new(
        description,
        predicted,
        correct,
        Utc::now() - Duration::days(days_ago),
    )
    .unwrap()
}

pub fn candidate(code: &str, confidence: f32) -> CandidateCode {
    CandidateCode {
        code: code.to_string(),
        description: format!("Reference description for {}", code),
        confidence,
        rate: "Free".to_string(),
        units: vec!["No.".to_string()],
    }
}

/// Classifier that always returns the same ranked candidates
pub struct StaticClassifier {
    candidates: Vec<CandidateCode>,
}

impl StaticClassifier {
    pub fn new(candidates: Vec<CandidateCode>) -> Self {
        Self { candidates }
    }

    pub fn empty() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }
}

#[async_trait]
impl PrimaryClassifier for StaticClassifier {
    async fn classify(&self, _description: &str, top_k: usize) -> Result<Vec<CandidateCode>> {
        Ok(self.candidates.iter().take(top_k).cloned().collect())
    }
}

/// Classifier whose calls always fail
pub struct FailingClassifier;

#[async_trait]
impl PrimaryClassifier for FailingClassifier {
    async fn classify(&self, _description: &str, _top_k: usize) -> Result<Vec<CandidateCode>> {
        Err(TariffsenseError::Classifier(
            "classifier is down".to_string(),
        ))
    }
}

/// Index that answers every query with a fixed set of scored hits
pub struct ScriptedIndex {
    hits: Vec<ScoredEntry>,
    inserted: RwLock<Vec<FeedbackEntry>>,
}

impl ScriptedIndex {
    pub fn new(hits: Vec<(FeedbackEntry, f32)>) -> Self {
        let mut hits: Vec<ScoredEntry> = hits
            .into_iter()
            .map(|(entry, similarity)| ScoredEntry { entry, similarity })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self {
            hits,
            inserted: RwLock::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub async fn inserted_count(&self) -> usize {
        self.inserted.read().await.len()
    }
}

#[async_trait]
impl SimilarityIndex for ScriptedIndex {
    async fn query(&self, _text: &str, top_k: usize) -> Result<Vec<ScoredEntry>> {
        Ok(self.hits.iter().take(top_k).cloned().collect())
    }

    async fn insert(&self, entry: &FeedbackEntry) -> Result<()> {
        self.inserted.write().await.push(entry.clone());
        Ok(())
    }
}

/// Index whose calls always fail
pub struct FailingIndex;

#[async_trait]
impl SimilarityIndex for FailingIndex {
    async fn query(&self, _text: &str, _top_k: usize) -> Result<Vec<ScoredEntry>> {
        Err(TariffsenseError::Index("index is down".to_string()))
    }

    async fn insert(&self, _entry: &FeedbackEntry) -> Result<()> {
        Err(TariffsenseError::Index("index is down".to_string()))
    }
}
