//! Time-bounded feedback cache
//!
//! In-memory view of recent feedback entries, reloaded from the store on
//! demand. A snapshot is served while it is younger than the TTL and
//! covers the requested window; correction submissions invalidate it so
//! the next lookup sees fresh data. The snapshot is rebuilt wholesale,
//! never patched in place.
//!
//! When the store is unreachable the cache degrades to the last good
//! snapshot (even a stale or invalidated one), and to an empty list when
//! it has never loaded. Callers treat an empty list as "no information",
//! not "confirmed no matches".

use crate::feedback::FeedbackStore;
use crate::types::FeedbackEntry;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

struct Snapshot {
    entries: Vec<FeedbackEntry>,
    /// None once invalidated; such a snapshot is only served on the
    /// store-unreachable degraded path
    loaded_at: Option<DateTime<Utc>>,
    window_days: i64,
}

/// Shared, injectable cache over a [`FeedbackStore`]
pub struct FeedbackCache {
    store: Arc<dyn FeedbackStore>,
    ttl: Duration,
    state: RwLock<Option<Snapshot>>,
}

impl FeedbackCache {
    /// Create a cache over the given store with the given snapshot TTL
    pub fn new(store: Arc<dyn FeedbackStore>, ttl: std::time::Duration) -> Self {
        let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::seconds(86_400));
        Self {
            store,
            ttl,
            state: RwLock::new(None),
        }
    }

    /// Feedback entries no older than `window_days`.
    ///
    /// Served from the snapshot when possible, otherwise reloaded. Never
    /// fails: store errors degrade to the last good snapshot or an empty
    /// list.
    pub async fn get_recent(&self, window_days: i64) -> Vec<FeedbackEntry> {
        {
            let state = self.state.read().await;
            if let Some(entries) = Self::serve_fresh(&state, window_days, self.ttl) {
                debug!(
                    "Serving {} feedback entries from cache (window: {}d)",
                    entries.len(),
                    window_days
                );
                return entries;
            }
        }

        let mut state = self.state.write().await;

        // Another task may have reloaded while we waited for the lock
        if let Some(entries) = Self::serve_fresh(&state, window_days, self.ttl) {
            return entries;
        }

        let cutoff = Utc::now() - Duration::days(window_days);
        match self.store.read_since(cutoff).await {
            Ok(entries) => {
                info!(
                    "Loaded {} feedback entries from store (window: {}d)",
                    entries.len(),
                    window_days
                );
                let result = entries.clone();
                *state = Some(Snapshot {
                    entries,
                    loaded_at: Some(Utc::now()),
                    window_days,
                });
                result
            }
            Err(e) => {
                warn!("Feedback store unreachable, serving last good snapshot: {}", e);
                match &*state {
                    Some(snapshot) => filter_window(&snapshot.entries, window_days),
                    None => Vec::new(),
                }
            }
        }
    }

    /// Mark the snapshot expired so the next lookup reloads.
    ///
    /// Must be called after every successful feedback append; the entries
    /// are retained only for the store-unreachable degraded path.
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        if let Some(snapshot) = state.as_mut() {
            snapshot.loaded_at = None;
            debug!("Feedback cache invalidated");
        }
    }

    fn serve_fresh(
        state: &Option<Snapshot>,
        window_days: i64,
        ttl: Duration,
    ) -> Option<Vec<FeedbackEntry>> {
        let snapshot = state.as_ref()?;
        let loaded_at = snapshot.loaded_at?;

        if snapshot.window_days >= window_days && Utc::now() - loaded_at < ttl {
            Some(filter_window(&snapshot.entries, window_days))
        } else {
            None
        }
    }
}

fn filter_window(entries: &[FeedbackEntry], window_days: i64) -> Vec<FeedbackEntry> {
    let cutoff = Utc::now() - Duration::days(window_days);
    entries
        .iter()
        .filter(|e| e.timestamp >= cutoff)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, TariffsenseError};
    use crate::feedback::InMemoryFeedbackStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts store reads so tests can observe cache hits vs reloads
    struct CountingStore {
        inner: InMemoryFeedbackStore,
        reads: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: InMemoryFeedbackStore::new(),
                reads: AtomicUsize::new(0),
            }
        }

        fn read_count(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedbackStore for CountingStore {
        async fn append(&self, entry: &FeedbackEntry) -> Result<()> {
            self.inner.append(entry).await
        }

        async fn read_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<FeedbackEntry>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read_since(cutoff).await
        }
    }

    /// Store whose reads always fail, for the degraded path
    struct FailingStore;

    #[async_trait]
    impl FeedbackStore for FailingStore {
        async fn append(&self, _entry: &FeedbackEntry) -> Result<()> {
            Err(TariffsenseError::Store("store is down".to_string()))
        }

        async fn read_since(&self, _cutoff: DateTime<Utc>) -> Result<Vec<FeedbackEntry>> {
            Err(TariffsenseError::Store("store is down".to_string()))
        }
    }

    fn entry(description: &str, days_ago: i64) -> FeedbackEntry {
        FeedbackEntry::new(
            description,
            "4205",
            "4202",
            Utc::now() - Duration::days(days_ago),
        )
        .unwrap()
    }

    const TTL: std::time::Duration = std::time::Duration::from_secs(300);

    #[tokio::test]
    async fn test_lazy_load_then_cache_hit() {
        let store = Arc::new(CountingStore::new());
        store.append(&entry("leather handbag", 1)).await.unwrap();

        let cache = FeedbackCache::new(store.clone(), TTL);
        assert_eq!(store.read_count(), 0);

        let first = cache.get_recent(30).await;
        assert_eq!(first.len(), 1);
        assert_eq!(store.read_count(), 1);

        let second = cache.get_recent(30).await;
        assert_eq!(second.len(), 1);
        assert_eq!(store.read_count(), 1, "Second lookup must hit the cache");
    }

    #[tokio::test]
    async fn test_smaller_window_refilters_without_reload() {
        let store = Arc::new(CountingStore::new());
        store.append(&entry("recent entry", 1)).await.unwrap();
        store.append(&entry("older entry", 20)).await.unwrap();

        let cache = FeedbackCache::new(store.clone(), TTL);

        assert_eq!(cache.get_recent(30).await.len(), 2);

        let narrow = cache.get_recent(5).await;
        assert_eq!(narrow.len(), 1);
        assert_eq!(narrow[0].description, "recent entry");
        assert_eq!(store.read_count(), 1, "Narrower window must not reload");
    }

    #[tokio::test]
    async fn test_wider_window_forces_reload() {
        let store = Arc::new(CountingStore::new());
        store.append(&entry("older entry", 20)).await.unwrap();

        let cache = FeedbackCache::new(store.clone(), TTL);

        assert_eq!(cache.get_recent(5).await.len(), 0);
        assert_eq!(cache.get_recent(30).await.len(), 1);
        assert_eq!(store.read_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let store = Arc::new(CountingStore::new());
        store.append(&entry("first entry", 1)).await.unwrap();

        let cache = FeedbackCache::new(store.clone(), TTL);
        assert_eq!(cache.get_recent(30).await.len(), 1);

        store.append(&entry("second entry", 0)).await.unwrap();
        // New entry not visible until invalidation
        assert_eq!(cache.get_recent(30).await.len(), 1);

        cache.invalidate().await;
        let reloaded = cache.get_recent(30).await;
        assert_eq!(reloaded.len(), 2);
        assert_eq!(store.read_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_reloads() {
        let store = Arc::new(CountingStore::new());
        store.append(&entry("entry", 1)).await.unwrap();

        let cache = FeedbackCache::new(store.clone(), std::time::Duration::from_secs(0));
        cache.get_recent(30).await;
        cache.get_recent(30).await;
        assert_eq!(store.read_count(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_without_snapshot_returns_empty() {
        let cache = FeedbackCache::new(Arc::new(FailingStore), TTL);
        assert!(cache.get_recent(30).await.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_serves_stale_snapshot() {
        // A store that works once, then fails
        struct FlakyStore {
            inner: InMemoryFeedbackStore,
            reads: AtomicUsize,
        }

        #[async_trait]
        impl FeedbackStore for FlakyStore {
            async fn append(&self, entry: &FeedbackEntry) -> Result<()> {
                self.inner.append(entry).await
            }

            async fn read_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<FeedbackEntry>> {
                if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                    self.inner.read_since(cutoff).await
                } else {
                    Err(TariffsenseError::Store("store is down".to_string()))
                }
            }
        }

        let store = Arc::new(FlakyStore {
            inner: InMemoryFeedbackStore::new(),
            reads: AtomicUsize::new(0),
        });
        store.append(&entry("survivor", 1)).await.unwrap();

        let cache = FeedbackCache::new(store, TTL);
        assert_eq!(cache.get_recent(30).await.len(), 1);

        // Invalidated snapshot + dead store: stale data beats nothing
        cache.invalidate().await;
        let degraded = cache.get_recent(30).await;
        assert_eq!(degraded.len(), 1);
        assert_eq!(degraded[0].description, "survivor");
    }
}
