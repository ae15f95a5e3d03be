//! Feedback log storage and caching
//!
//! The feedback log is append-only: every classification the user confirms
//! or corrects becomes one immutable entry. This module owns the store
//! seam, two store implementations, and the time-bounded cache the
//! resolver reads through.

pub mod cache;
pub mod memory;
pub mod sqlite;

pub use cache::FeedbackCache;
pub use memory::InMemoryFeedbackStore;
pub use sqlite::SqliteFeedbackStore;

use crate::error::Result;
use crate::types::FeedbackEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Append-only feedback log seam
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Append one entry to the log
    async fn append(&self, entry: &FeedbackEntry) -> Result<()>;

    /// Read entries with `timestamp >= cutoff`, oldest first
    async fn read_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<FeedbackEntry>>;
}
