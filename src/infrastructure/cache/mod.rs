//! Result cache for fetched job postings
//!
//! Entries live in a moka cache keyed by the normalized search signature
//! itself.
//! Expiry is checked on read against each entry's own deadline.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache as MokaCache;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::domain::job::{JobRecord, SearchSignature};
use crate::domain::DomainError;

/// Default time to live for fetched results (one week)
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(168 * 3600);

/// Configuration for the result cache
#[derive(Debug, Clone)]
pub struct ResultCacheConfig {
    /// Maximum number of signatures held
    pub max_capacity: u64,
    /// TTL used by callers that do not pass one
    pub default_ttl: Duration,
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1_000,
            default_ttl: DEFAULT_RESULT_TTL,
        }
    }
}

impl ResultCacheConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// Fetched records for one signature
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub items: Arc<Vec<JobRecord>>,
    pub signature: SearchSignature,
    pub created_at: Instant,
    pub expires_at: Instant,
    /// Wall-clock fetch time, for display
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }

    /// Time left before expiry
    pub fn expires_in(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// What to drop from the cache
#[derive(Debug, Clone)]
pub enum CacheInvalidation {
    Signature(SearchSignature),
    All,
}

/// TTL-keyed store from search signature to fetched records
#[derive(Debug)]
pub struct ResultCache {
    cache: MokaCache<SearchSignature, CacheEntry>,
    config: ResultCacheConfig,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_config(ResultCacheConfig::default())
    }

    pub fn with_config(config: ResultCacheConfig) -> Self {
        Self {
            cache: MokaCache::builder().max_capacity(config.max_capacity).build(),
            config,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    /// Valid entry for the signature; an expired entry is evicted
    pub async fn get(&self, signature: &SearchSignature) -> Option<CacheEntry> {
        let entry = self.cache.get(signature).await?;

        if entry.is_valid() {
            debug!(signature = %signature, items = entry.items.len(), "Result cache hit");
            return Some(entry);
        }

        debug!(signature = %signature, "Result cache entry expired");
        self.cache.remove(signature).await;
        None
    }

    /// Replace the entry for `signature`
    pub async fn put(
        &self,
        signature: SearchSignature,
        items: Vec<JobRecord>,
        ttl: Duration,
    ) -> Result<CacheEntry, DomainError> {
        if ttl.is_zero() {
            return Err(DomainError::validation("cache TTL must be positive"));
        }

        let created_at = Instant::now();
        let expires_at = created_at
            .checked_add(ttl)
            .ok_or_else(|| DomainError::validation("cache TTL too large"))?;
        let entry = CacheEntry {
            items: Arc::new(items),
            signature: signature.clone(),
            created_at,
            expires_at,
            fetched_at: Utc::now(),
        };

        info!(
            signature = %signature,
            items = entry.items.len(),
            ttl_secs = ttl.as_secs(),
            "Caching fetched results"
        );
        self.cache.insert(signature, entry.clone()).await;

        Ok(entry)
    }

    pub async fn invalidate(&self, invalidation: CacheInvalidation) {
        match invalidation {
            CacheInvalidation::Signature(signature) => {
                self.cache.remove(&signature).await;
            }
            CacheInvalidation::All => {
                self.cache.invalidate_all();
                self.cache.run_pending_tasks().await;
            }
        }
    }

    /// Drop every expired entry; returns how many were removed
    pub async fn sweep_expired(&self) -> usize {
        let expired: Vec<Arc<SearchSignature>> = self
            .cache
            .iter()
            .filter(|(_, entry)| !entry.is_valid())
            .map(|(key, _)| key)
            .collect();

        for key in &expired {
            self.cache.remove(key.as_ref()).await;
        }

        if !expired.is_empty() {
            info!(removed = expired.len(), "Swept expired result cache entries");
        }
        expired.len()
    }

    /// Number of entries, including expired ones not yet evicted
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(query: &str) -> SearchSignature {
        SearchSignature::build(query, "Hong Kong", 25, "fulltime", "hk")
    }

    fn records(n: usize) -> Vec<JobRecord> {
        (0..n)
            .map(|i| JobRecord::new(format!("Job {}", i), "Acme", format!("https://jobs/{}", i)))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_within_ttl_returns_items_unchanged() {
        let cache = ResultCache::new();
        let items = records(3);
        let ttl = Duration::from_secs(3600);

        cache.put(signature("analyst"), items.clone(), ttl).await.unwrap();

        let entry = cache.get(&signature("analyst")).await.unwrap();
        assert_eq!(*entry.items, items);

        tokio::time::advance(ttl - Duration::from_millis(1)).await;
        let entry = cache.get(&signature("analyst")).await.unwrap();
        assert_eq!(*entry.items, items);
        assert!(entry.expires_at > entry.created_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_at_ttl_returns_none_and_evicts() {
        let cache = ResultCache::new();
        let ttl = Duration::from_secs(60);

        cache.put(signature("analyst"), records(1), ttl).await.unwrap();
        tokio::time::advance(ttl).await;

        assert!(cache.get(&signature("analyst")).await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_normalized_signatures_share_entry() {
        let cache = ResultCache::new();
        let sig = SearchSignature::build("Data Scientist", "Hong Kong", 25, "fulltime", "hk");
        let same = SearchSignature::build(" data scientist ", "HONG KONG", 25, "FullTime", "HK");

        cache.put(sig, records(2), DEFAULT_RESULT_TTL).await.unwrap();

        assert!(cache.get(&same).await.is_some());
    }

    #[tokio::test]
    async fn test_put_replaces_wholesale() {
        let cache = ResultCache::new();

        cache.put(signature("a"), records(5), DEFAULT_RESULT_TTL).await.unwrap();
        cache.put(signature("a"), records(2), DEFAULT_RESULT_TTL).await.unwrap();

        assert_eq!(cache.get(&signature("a")).await.unwrap().items.len(), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_rejected() {
        let cache = ResultCache::new();
        let result = cache.put(signature("a"), records(1), Duration::ZERO).await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_rejected() {
        let cache = ResultCache::new();
        let result = cache
            .put(signature("a"), records(1), Duration::from_secs(u64::MAX))
            .await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_separator_in_query_keeps_entries_apart() {
        let cache = ResultCache::new();
        let left = SearchSignature::build("a|b", "c", 25, "fulltime", "hk");
        let right = SearchSignature::build("a", "b|c", 25, "fulltime", "hk");

        cache.put(left.clone(), records(1), DEFAULT_RESULT_TTL).await.unwrap();

        assert!(cache.get(&left).await.is_some());
        assert!(cache.get(&right).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_signature_and_all() {
        let cache = ResultCache::new();
        cache.put(signature("a"), records(1), DEFAULT_RESULT_TTL).await.unwrap();
        cache.put(signature("b"), records(1), DEFAULT_RESULT_TTL).await.unwrap();

        cache.invalidate(CacheInvalidation::Signature(signature("a"))).await;
        assert!(cache.get(&signature("a")).await.is_none());
        assert!(cache.get(&signature("b")).await.is_some());

        cache.invalidate(CacheInvalidation::All).await;
        assert!(cache.get(&signature("b")).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expired() {
        let cache = ResultCache::new();
        cache.put(signature("short"), records(1), Duration::from_secs(10)).await.unwrap();
        cache.put(signature("long"), records(1), Duration::from_secs(1000)).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(cache.sweep_expired().await, 1);
        assert!(cache.get(&signature("long")).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_in_counts_down() {
        let cache = ResultCache::new();
        let entry = cache
            .put(signature("a"), records(1), Duration::from_secs(120))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(entry.expires_in(), Duration::from_secs(100));
    }
}
