//! Local hashing embedder
//!
//! Deterministic character-n-gram and word hashing into a normalized
//! fixed-size vector. No model download, no network: suitable for tests,
//! air-gapped deployments, and as the embedder behind the in-memory
//! similarity index. Quality is well below a learned model, which is
//! acceptable for the degraded paths it serves.

use crate::embeddings::TextEmbedder;
use crate::error::{Result, TariffsenseError};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Default dimension for hash embeddings
pub const HASH_EMBEDDING_DIM: usize = 384;

/// Character n-gram window sizes hashed into the vector
const NGRAM_RANGE: std::ops::RangeInclusive<usize> = 2..=4;

/// Weight of whole-word hashes relative to character n-grams
const WORD_WEIGHT: f32 = 2.0;

/// Deterministic local embedding generator
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            dimensions: HASH_EMBEDDING_DIM,
        }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];
        let text_lower = text.to_lowercase();
        let chars: Vec<char> = text_lower.chars().collect();

        // Character n-grams capture spelling variants and compound terms
        for window_size in NGRAM_RANGE {
            for window in chars.windows(window_size) {
                let mut hasher = DefaultHasher::new();
                window.iter().collect::<String>().hash(&mut hasher);
                let dim = (hasher.finish() as usize) % self.dimensions;
                embedding[dim] += 1.0;
            }
        }

        // Whole words weighted above n-grams
        for word in text_lower.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let dim = (hasher.finish() as usize) % self.dimensions;
            embedding[dim] += WORD_WEIGHT;
        }

        // Normalize to unit length
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for val in &mut embedding {
                *val /= magnitude;
            }
        }

        embedding
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextEmbedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(TariffsenseError::InvalidInput(
                "Text cannot be empty".to_string(),
            ));
        }

        Ok(self.embed_text(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
