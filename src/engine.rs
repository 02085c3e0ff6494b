//! Composition root
//!
//! `MatchEngine` owns one instance of every shared component and hands them
//! to the pipeline explicitly. Build it once per process and share it.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::{AppConfig, MatchingSettings};
use crate::domain::usage::UsageSummary;
use crate::domain::vector_store::StoreKind;
use crate::domain::{DomainError, JobFetcher};
use crate::infrastructure::cache::{CacheInvalidation, ResultCache};
use crate::infrastructure::embedding::LazyEmbedder;
use crate::infrastructure::fetcher::IndeedJobFetcher;
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::index::EmbeddingIndex;
use crate::infrastructure::matching::SkillMatcher;
use crate::infrastructure::pipeline::{
    CandidateProfile, IndexPolicy, MatchPipeline, SearchOutcome, SearchRequest,
};
use crate::infrastructure::rate_limit::{RateLimitStatus, RateLimiter};
use crate::infrastructure::usage::UsageTracker;
use crate::infrastructure::vector_store::{StoreSelection, VectorStoreFactory};

/// Which vector store backs the index and why
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatus {
    pub kind: StoreKind,
    /// Reason the durable backend was not used, when it was requested
    pub degraded: Option<String>,
}

/// The job match engine
pub struct MatchEngine {
    matching: MatchingSettings,
    fetcher: Arc<dyn JobFetcher>,
    rate_limiter: Arc<RateLimiter>,
    usage: Arc<UsageTracker>,
    cache: Arc<ResultCache>,
    index: Arc<EmbeddingIndex>,
    pipeline: MatchPipeline,
    store_status: StoreStatus,
}

impl std::fmt::Debug for MatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchEngine")
            .field("source", &self.fetcher.source_name())
            .field("store", &self.store_status)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl MatchEngine {
    /// Build every component from configuration.
    ///
    /// Missing API keys are not an error here; they surface as degraded
    /// search statuses.
    pub async fn from_config(config: &AppConfig) -> Result<Self, DomainError> {
        let usage = Arc::new(UsageTracker::new());

        let client = HttpClient::with_timeout(config.fetcher.timeout())?;
        let fetcher: Arc<dyn JobFetcher> =
            Arc::new(IndeedJobFetcher::new(client, config.fetcher.indeed_config()));

        let embedder = LazyEmbedder::new(config.embedding.service_config(), usage.clone());
        let selection = VectorStoreFactory::create(&config.vector_store.environment()).await;

        Ok(Self::assemble(config, fetcher, embedder, usage, selection))
    }

    /// Wire already built collaborators together
    pub fn assemble(
        config: &AppConfig,
        fetcher: Arc<dyn JobFetcher>,
        embedder: LazyEmbedder,
        usage: Arc<UsageTracker>,
        selection: StoreSelection,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit.max_calls,
            config.rate_limit.window(),
        ));
        let cache = Arc::new(ResultCache::with_config(config.cache.cache_config()));
        let index = Arc::new(EmbeddingIndex::new(selection.store));
        let skills = Arc::new(
            SkillMatcher::new().with_threshold(config.matching.skill_similarity_threshold),
        );

        let pipeline = MatchPipeline::new(
            fetcher.clone(),
            rate_limiter.clone(),
            cache.clone(),
            index.clone(),
            Arc::new(embedder),
            skills,
        )
        .with_semantic_skills(config.matching.semantic_skills);

        let store_status = StoreStatus {
            kind: selection.kind,
            degraded: selection.degraded.map(|e| e.to_string()),
        };

        info!(
            source = fetcher.source_name(),
            store = %store_status.kind,
            semantic_skills = config.matching.semantic_skills,
            "Match engine ready"
        );

        Self {
            matching: config.matching.clone(),
            fetcher,
            rate_limiter,
            usage,
            cache,
            index,
            pipeline,
            store_status,
        }
    }

    /// A request carrying the configured policy and minimum score
    pub fn request(
        &self,
        profile: CandidateProfile,
        keywords: impl Into<String>,
        location: impl Into<String>,
        max_results: u32,
    ) -> SearchRequest {
        let mut policy =
            IndexPolicy::new(self.matching.top_k).with_multiplier(self.matching.index_multiplier);
        policy.max_index = self.matching.max_index;

        SearchRequest::new(profile, keywords, location, max_results)
            .with_min_match_score(self.matching.min_match_score)
            .with_policy(policy)
    }

    pub async fn search(&self, request: SearchRequest) -> SearchOutcome {
        self.pipeline.run(request).await
    }

    /// Search with configured defaults for everything but the essentials
    pub async fn search_with(
        &self,
        profile: CandidateProfile,
        keywords: &str,
        location: &str,
        max_results: u32,
        min_match_score: f32,
    ) -> SearchOutcome {
        let request = self
            .request(profile, keywords, location, max_results)
            .with_min_match_score(min_match_score);
        self.search(request).await
    }

    pub fn usage_summary(&self) -> UsageSummary {
        self.usage.summary()
    }

    pub fn reset_usage(&self) {
        self.usage.reset();
    }

    pub async fn invalidate_cache(&self, invalidation: CacheInvalidation) {
        self.cache.invalidate(invalidation).await;
    }

    /// Drop expired cache entries; returns how many were removed
    pub async fn sweep_expired_cache(&self) -> usize {
        self.cache.sweep_expired().await
    }

    /// Forget every indexed vector, including durable ones
    pub async fn clear_index(&self) -> Result<(), DomainError> {
        self.index.clear().await
    }

    pub fn store_status(&self) -> &StoreStatus {
        &self.store_status
    }

    pub async fn rate_limit_status(&self) -> RateLimitStatus {
        self.rate_limiter.status().await
    }

    /// Probe the job source. Takes a rate limit slot without waiting and
    /// fails with `RateLimited` when none is free.
    pub async fn check_source(&self) -> Result<(), DomainError> {
        self.rate_limiter.try_acquire().await?;
        self.fetcher.health_check().await
    }

    pub fn source_name(&self) -> &'static str {
        self.fetcher.source_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::fetcher::MockJobFetcher;
    use crate::domain::job::JobRecord;
    use crate::domain::matching::Percent;
    use crate::infrastructure::embedding::EmbeddingService;
    use crate::infrastructure::pipeline::SearchStatus;
    use crate::infrastructure::vector_store::{InMemoryVectorStore, StoreMode};

    fn volatile_selection() -> StoreSelection {
        StoreSelection {
            store: Arc::new(InMemoryVectorStore::new()),
            kind: StoreKind::Volatile,
            degraded: None,
        }
    }

    fn engine(fetcher: MockJobFetcher) -> MatchEngine {
        let usage = Arc::new(UsageTracker::new());
        let service = EmbeddingService::new(
            Arc::new(MockEmbeddingProvider::new("mock", 8)),
            "text-embedding-3-small",
            usage.clone(),
        );

        MatchEngine::assemble(
            &AppConfig::default(),
            Arc::new(fetcher),
            LazyEmbedder::from_service(Arc::new(service)),
            usage,
            volatile_selection(),
        )
    }

    fn fetcher_with(n: usize) -> MockJobFetcher {
        let items: Vec<JobRecord> = (1..=n)
            .map(|i| {
                JobRecord::new(format!("Analyst {}", i), "Acme", format!("https://jobs/{}", i))
                    .with_skills(["SQL", "Excel"])
            })
            .collect();

        let mut fetcher = MockJobFetcher::new();
        fetcher.expect_source_name().return_const("mock");
        fetcher.expect_fetch().returning(move |_| Ok(items.clone()));
        fetcher
    }

    fn profile() -> CandidateProfile {
        CandidateProfile::new("Data Analyst").with_skills(["SQL", "Python"])
    }

    #[tokio::test]
    async fn test_search_records_embedding_usage() {
        let engine = engine(fetcher_with(4));

        let outcome = engine
            .search_with(profile(), "analyst", "Hong Kong", 25, 0.0)
            .await;

        assert_eq!(outcome.status, SearchStatus::Matched);
        assert_eq!(outcome.results.len(), 4);

        let usage = engine.usage_summary();
        assert!(usage.embedding_tokens > 0);
        assert!(usage.cost_usd > 0.0);

        engine.reset_usage();
        assert_eq!(engine.usage_summary(), UsageSummary::default());
    }

    #[tokio::test]
    async fn test_invalidate_cache_forces_refetch() {
        let engine = engine(fetcher_with(2));

        engine.search_with(profile(), "analyst", "HK", 10, 0.0).await;
        let cached = engine.search_with(profile(), " ANALYST ", "hk", 10, 0.0).await;
        engine.invalidate_cache(CacheInvalidation::All).await;
        let refreshed = engine.search_with(profile(), "analyst", "HK", 10, 0.0).await;

        assert!(cached.cache_hit);
        assert!(!refreshed.cache_hit);
    }

    #[tokio::test]
    async fn test_clear_index_and_sweep() {
        let engine = engine(fetcher_with(2));
        engine.search_with(profile(), "analyst", "HK", 10, 0.0).await;

        engine.clear_index().await.unwrap();

        assert!(engine.index.is_empty().await);
        assert_eq!(engine.sweep_expired_cache().await, 0);
    }

    #[tokio::test]
    async fn test_check_source_does_not_wait_for_a_slot() {
        let mut fetcher = fetcher_with(1);
        fetcher.expect_health_check().times(10).returning(|| Ok(()));
        let engine = engine(fetcher);

        for _ in 0..10 {
            tokio_test::assert_ok!(engine.check_source().await);
        }
        let err = tokio_test::assert_err!(engine.check_source().await);

        assert!(matches!(err, DomainError::RateLimited { .. }));
        assert_eq!(engine.rate_limit_status().await.remaining, 0);
    }

    #[tokio::test]
    async fn test_request_uses_configured_policy() {
        let engine = engine(fetcher_with(1));
        let request = engine.request(profile(), "analyst", "HK", 10);

        assert_eq!(request.policy, IndexPolicy::default());
        assert_eq!(request.min_match_score, Percent::ZERO);
    }

    #[tokio::test]
    async fn test_from_config_without_keys_degrades() {
        let mut config = AppConfig::default();
        config.vector_store.mode = StoreMode::Volatile;

        let engine = MatchEngine::from_config(&config).await.unwrap();
        let outcome = engine.search_with(profile(), "analyst", "HK", 10, 0.0).await;

        assert_eq!(engine.store_status().kind, StoreKind::Volatile);
        assert_eq!(engine.source_name(), "indeed");
        assert!(matches!(outcome.status, SearchStatus::FetchFailed { .. }));
    }
}
