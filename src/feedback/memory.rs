//! In-memory feedback store
//!
//! Keeps the whole log in a `Vec` behind an async RwLock. Used as a test
//! double and for small single-process deployments where durability is
//! handled elsewhere.

use crate::error::Result;
use crate::feedback::FeedbackStore;
use crate::types::FeedbackEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Volatile feedback log
pub struct InMemoryFeedbackStore {
    entries: RwLock<Vec<FeedbackEntry>>,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Total entries in the log, regardless of age
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryFeedbackStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedbackStore for InMemoryFeedbackStore {
    async fn append(&self, entry: &FeedbackEntry) -> Result<()> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn read_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<FeedbackEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.timestamp >= cutoff)
            .cloned()
            .collect())
    }
}
