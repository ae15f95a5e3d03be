//! Exact-match resolution against cached feedback
//!
//! A description the user has already corrected is the strongest signal
//! the system has. Matching is done on a normalized form (case-folded,
//! trimmed, internal whitespace collapsed) so trivial re-typings still
//! hit.

use crate::feedback::FeedbackCache;
use crate::types::FeedbackEntry;
use std::sync::Arc;
use tracing::debug;

/// Resolves byte-for-byte (normalized) description matches
pub struct ExactMatchResolver {
    cache: Arc<FeedbackCache>,
}

impl ExactMatchResolver {
    pub fn new(cache: Arc<FeedbackCache>) -> Self {
        Self { cache }
    }

    /// The most recent corrective entry whose normalized description
    /// equals the query's. A later correction supersedes an earlier one
    /// for the same description; confirmatory entries never match, since
    /// they add nothing beyond what the primary classifier produces.
    pub async fn find_exact(&self, description: &str, window_days: i64) -> Option<FeedbackEntry> {
        let needle = normalize_description(description);

        let mut best: Option<FeedbackEntry> = None;
        for entry in self.cache.get_recent(window_days).await {
            if !entry.is_correction() {
                continue;
            }
            if normalize_description(&entry.description) != needle {
                continue;
            }
            match &best {
                Some(current) if current.timestamp >= entry.timestamp => {}
                _ => best = Some(entry),
            }
        }

        if let Some(entry) = &best {
            debug!(
                "Exact feedback match: '{}' corrected {} -> {}",
                entry.description, entry.predicted_code, entry.correct_code
            );
        }

        best
    }
}

/// Case-fold, trim, and collapse internal whitespace runs to single spaces
pub(crate) fn normalize_description(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{FeedbackStore, InMemoryFeedbackStore};
    use chrono::{Duration, Utc};
    use std::time::Duration as StdDuration;

    #[test]
    fn test_normalize_description() {
        assert_eq!(normalize_description("Leather Handbag"), "leather handbag");
        assert_eq!(
            normalize_description("  leather   handbag  "),
            "leather handbag"
        );
        assert_eq!(
            normalize_description("leather\t\nhandbag"),
            "leather handbag"
        );
        assert_eq!(normalize_description(""), "");
    }

    async fn resolver_with(entries: Vec<FeedbackEntry>) -> ExactMatchResolver {
        let store = Arc::new(InMemoryFeedbackStore::new());
        for entry in &entries {
            store.append(entry).await.unwrap();
        }
        let cache = Arc::new(FeedbackCache::new(store, StdDuration::from_secs(300)));
        ExactMatchResolver::new(cache)
    }

    fn entry(
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

    #[tokio::test]
    async fn test_finds_normalized_match() {
        let resolver = resolver_with(vec![entry("Leather  Handbag", "4205", "4202", 1)]).await;

        let found = resolver.find_exact("leather handbag", 30).await;
        assert_eq!(found.unwrap().correct_code, "4202");
    }

    #[tokio::test]
    async fn test_no_match_returns_none() {
        let resolver = resolver_with(vec![entry("leather handbag", "4205", "4202", 1)]).await;
        assert!(resolver.find_exact("cotton t-shirt", 30).await.is_none());
    }

    #[tokio::test]
    async fn test_latest_correction_wins() {
        let resolver = resolver_with(vec![
            entry("leather handbag", "4205", "4203", 10),
            entry("leather handbag", "4205", "4202", 1),
        ])
        .await;

        let found = resolver.find_exact("leather handbag", 30).await;
        assert_eq!(found.unwrap().correct_code, "4202");
    }

    #[tokio::test]
    async fn test_confirmatory_entries_do_not_match() {
        let resolver = resolver_with(vec![entry("leather handbag", "4202", "4202", 1)]).await;
        assert!(resolver.find_exact("leather handbag", 30).await.is_none());
    }

    #[tokio::test]
    async fn test_window_limits_matches() {
        let resolver = resolver_with(vec![entry("leather handbag", "4205", "4202", 60)]).await;
        assert!(resolver.find_exact("leather handbag", 30).await.is_none());
    }
}
