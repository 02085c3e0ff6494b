//! Match pipeline
//!
//! One run: signature, cache check, rate-limited fetch, indexing, query,
//! skill scoring and ranking. External failures end the run with an empty
//! result and a `SearchStatus`; they never escape as errors.

mod request;

pub use request::{
    CandidateProfile, IndexPolicy, SearchOutcome, SearchRequest, SearchStatus, QUERY_SKILL_COUNT,
    QUERY_SUMMARY_CHARS,
};

use std::sync::Arc;

use moka::future::Cache as MokaCache;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::job::{JobQuery, JobRecord, SearchSignature};
use crate::domain::matching::{rank_results, DomainFilter, MatchResult, SkillMatch, SkillTier};
use crate::domain::{DomainError, JobFetcher};
use crate::infrastructure::cache::ResultCache;
use crate::infrastructure::embedding::{EmbeddingService, LazyEmbedder};
use crate::infrastructure::index::{EmbeddingIndex, SearchHit};
use crate::infrastructure::matching::SkillMatcher;
use crate::infrastructure::rate_limit::RateLimiter;

/// Query texts whose vectors are remembered
const QUERY_VECTOR_CAPACITY: u64 = 256;

/// Orchestrates the shared components for one search at a time per caller
pub struct MatchPipeline {
    fetcher: Arc<dyn JobFetcher>,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<ResultCache>,
    index: Arc<EmbeddingIndex>,
    embedder: Arc<LazyEmbedder>,
    skills: Arc<SkillMatcher>,
    semantic_skills: bool,
    query_vectors: MokaCache<String, Arc<Vec<f32>>>,
}

impl std::fmt::Debug for MatchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchPipeline")
            .field("fetcher", &self.fetcher.source_name())
            .field("semantic_skills", &self.semantic_skills)
            .finish()
    }
}

impl MatchPipeline {
    pub fn new(
        fetcher: Arc<dyn JobFetcher>,
        rate_limiter: Arc<RateLimiter>,
        cache: Arc<ResultCache>,
        index: Arc<EmbeddingIndex>,
        embedder: Arc<LazyEmbedder>,
        skills: Arc<SkillMatcher>,
    ) -> Self {
        Self {
            fetcher,
            rate_limiter,
            cache,
            index,
            embedder,
            skills,
            semantic_skills: true,
            query_vectors: MokaCache::builder()
                .max_capacity(QUERY_VECTOR_CAPACITY)
                .build(),
        }
    }

    /// Use the semantic skill tier when the embedder allows it
    pub fn with_semantic_skills(mut self, enabled: bool) -> Self {
        self.semantic_skills = enabled;
        self
    }

    pub async fn run(&self, request: SearchRequest) -> SearchOutcome {
        let run_id = Uuid::new_v4();
        let query = request.job_query();
        let signature = query.signature();

        info!(
            run_id = %run_id,
            signature = %signature,
            force_refresh = request.force_refresh,
            "Starting match run"
        );

        // Step 1: cached records or a fresh fetch
        let cached = if request.force_refresh {
            None
        } else {
            self.cache.get(&signature).await
        };
        let cache_hit = cached.is_some();

        let items: Vec<JobRecord> = match cached {
            Some(entry) => entry.items.as_ref().clone(),
            None => match self.fetch(query, signature.clone()).await {
                Ok(items) => items,
                Err(e) => return degraded(run_id, SearchStatus::FetchFailed { message: e.to_string() }, cache_hit),
            },
        };

        let items = if request.target_domains.is_empty() {
            items
        } else {
            DomainFilter::filter(items, &request.target_domains)
        };

        if items.is_empty() {
            info!(run_id = %run_id, "No records for search");
            return SearchOutcome::empty(SearchStatus::NoResults, cache_hit);
        }
        let fetched = items.len();

        // Step 2: index a bounded prefix
        let embedder = match self.embedder.get().await {
            Ok(embedder) => embedder,
            Err(e) => return degraded(run_id, unavailable(e), cache_hit),
        };

        let limit = request.policy.index_limit(items.len());
        let indexed = match self.index.index(&items[..limit], &embedder).await {
            Ok(outcome) => outcome,
            Err(e) => return degraded(run_id, unavailable(e), cache_hit),
        };

        // Step 3: query the indexed prefix
        let query_vector = match self.query_vector(&request.profile.query_text(), &embedder).await {
            Ok(vector) => vector,
            Err(e) => return degraded(run_id, unavailable(e), cache_hit),
        };

        let hits = self
            .index
            .search_within(&indexed.hashes, &query_vector, request.policy.top_k)
            .await;

        // Step 4: score with one skill tier for the whole run
        let (scored, tier) = self.score(run_id, &request, hits, &embedder).await;

        // Step 5: filter and rank
        let min_score = request.min_match_score;
        let results = rank_results(
            scored
                .into_iter()
                .filter(|result| result.combined_score >= min_score)
                .collect(),
        );

        let status = if results.is_empty() {
            SearchStatus::NoResults
        } else {
            SearchStatus::Matched
        };

        info!(
            run_id = %run_id,
            fetched,
            indexed = limit,
            results = results.len(),
            cache_hit,
            tier = %tier,
            "Match run finished"
        );

        SearchOutcome {
            status,
            results,
            cache_hit,
            skill_tier: Some(tier),
            fetched,
            indexed: limit,
        }
    }

    /// Rate-limited fetch in its own task.
    ///
    /// The task writes the cache itself, so a caller that stops waiting
    /// does not lose the result for the next search. A failed cache write
    /// never fails the fetch.
    async fn fetch(&self, query: JobQuery, signature: SearchSignature) -> Result<Vec<JobRecord>, DomainError> {
        let fetcher = self.fetcher.clone();
        let rate_limiter = self.rate_limiter.clone();
        let cache = self.cache.clone();

        let task = tokio::spawn(async move {
            rate_limiter.wait_until_allowed().await;
            let items = fetcher.fetch(&query).await?;

            if !items.is_empty() {
                let ttl = cache.default_ttl();
                if let Err(e) = cache.put(signature, items.clone(), ttl).await {
                    warn!(error = %e, "Result cache write failed, continuing uncached");
                }
            }

            Ok::<_, DomainError>(items)
        });

        task.await.map_err(|e| {
            DomainError::fetch_failed(self.fetcher.source_name(), format!("fetch task failed: {}", e))
        })?
    }

    async fn query_vector(&self, text: &str, embedder: &EmbeddingService) -> Result<Arc<Vec<f32>>, DomainError> {
        if let Some(vector) = self.query_vectors.get(text).await {
            debug!("Query vector cache hit");
            return Ok(vector);
        }

        let vector = Arc::new(embedder.embed(text).await?);
        self.query_vectors.insert(text.to_string(), vector.clone()).await;
        Ok(vector)
    }

    async fn score(
        &self,
        run_id: Uuid,
        request: &SearchRequest,
        hits: Vec<SearchHit>,
        embedder: &EmbeddingService,
    ) -> (Vec<MatchResult>, SkillTier) {
        let candidate = &request.profile.skills;

        if self.semantic_skills {
            let mut matches = Vec::with_capacity(hits.len());
            let mut failure = None;

            for hit in &hits {
                match self
                    .skills
                    .match_semantic(candidate, &hit.record.skills, embedder)
                    .await
                {
                    Ok(skill_match) => matches.push(skill_match),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }

            match failure {
                None => return (build_results(hits, matches), SkillTier::Semantic),
                Some(e) => warn!(
                    run_id = %run_id,
                    error = %e,
                    "Semantic skill matching unavailable, scoring run with string tier"
                ),
            }
        }

        let matches: Vec<SkillMatch> = hits
            .iter()
            .map(|hit| self.skills.match_strings(candidate, &hit.record.skills))
            .collect();

        (build_results(hits, matches), SkillTier::String)
    }
}

fn build_results(hits: Vec<SearchHit>, matches: Vec<SkillMatch>) -> Vec<MatchResult> {
    hits.into_iter()
        .zip(matches)
        .map(|(hit, skill_match)| MatchResult::new(hit.record, hit.score, skill_match))
        .collect()
}

fn unavailable(error: DomainError) -> SearchStatus {
    SearchStatus::EmbeddingUnavailable {
        message: error.to_string(),
    }
}

fn degraded(run_id: Uuid, status: SearchStatus, cache_hit: bool) -> SearchOutcome {
    warn!(run_id = %run_id, status = ?status, "Match run degraded");
    SearchOutcome::empty(status, cache_hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use mockall::predicate::always;

    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::fetcher::MockJobFetcher;
    use crate::domain::matching::Percent;
    use crate::infrastructure::cache::ResultCacheConfig;
    use crate::infrastructure::usage::UsageTracker;
    use crate::infrastructure::vector_store::InMemoryVectorStore;

    struct Harness {
        pipeline: MatchPipeline,
        cache: Arc<ResultCache>,
        index: Arc<EmbeddingIndex>,
        provider: Arc<MockEmbeddingProvider>,
    }

    fn harness(fetcher: Arc<dyn JobFetcher>, provider: MockEmbeddingProvider) -> Harness {
        harness_with_cache(fetcher, provider, ResultCache::new())
    }

    fn harness_with_cache(
        fetcher: Arc<dyn JobFetcher>,
        provider: MockEmbeddingProvider,
        cache: ResultCache,
    ) -> Harness {
        let provider = Arc::new(provider);
        let usage = Arc::new(UsageTracker::new());
        let service = EmbeddingService::new(provider.clone(), "mock-embedding", usage);
        let cache = Arc::new(cache);
        let index = Arc::new(EmbeddingIndex::new(Arc::new(InMemoryVectorStore::new())));

        let pipeline = MatchPipeline::new(
            fetcher,
            Arc::new(RateLimiter::new(10, Duration::from_secs(60))),
            cache.clone(),
            index.clone(),
            Arc::new(LazyEmbedder::from_service(Arc::new(service))),
            Arc::new(SkillMatcher::new()),
        );

        Harness {
            pipeline,
            cache,
            index,
            provider,
        }
    }

    fn records(n: usize) -> Vec<JobRecord> {
        (1..=n)
            .map(|i| {
                JobRecord::new(format!("Job {}", i), "Acme", format!("https://jobs/{}", i))
                    .with_description(format!("Posting number {}", i))
                    .with_skills(["Python", "SQL"])
            })
            .collect()
    }

    fn request() -> SearchRequest {
        let profile = CandidateProfile::new("Data Scientist").with_skills(["python", "sql"]);
        SearchRequest::new(profile, "data scientist", "Hong Kong", 25)
    }

    fn fetcher_returning(items: Vec<JobRecord>, times: usize) -> MockJobFetcher {
        let mut fetcher = MockJobFetcher::new();
        fetcher.expect_source_name().return_const("mock");
        fetcher
            .expect_fetch()
            .with(always())
            .times(times)
            .returning(move |_| Ok(items.clone()));
        fetcher
    }

    #[tokio::test]
    async fn test_limits_indexing_and_top_k() {
        let items = records(10);
        let h = harness(
            Arc::new(fetcher_returning(items.clone(), 1)),
            MockEmbeddingProvider::new("mock", 8),
        );
        let request = request().with_policy(IndexPolicy::new(3).with_max_index(5));

        let outcome = h.pipeline.run(request).await;

        assert_eq!(outcome.status, SearchStatus::Matched);
        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.fetched, 10);
        assert_eq!(outcome.indexed, 5);
        assert_eq!(h.index.len().await, 5);

        let allowed: Vec<&str> = items[..5].iter().map(|r| r.title.as_str()).collect();
        for pair in outcome.results.windows(2) {
            assert!(pair[0].combined_score >= pair[1].combined_score);
        }
        for (position, result) in outcome.results.iter().enumerate() {
            assert!(allowed.contains(&result.record.title.as_str()));
            assert_eq!(result.rank, position + 1);
        }
    }

    #[tokio::test]
    async fn test_cache_hit_bypasses_fetcher() {
        let items = records(3);
        let h = harness(
            Arc::new(fetcher_returning(items.clone(), 0)),
            MockEmbeddingProvider::new("mock", 8),
        );
        let request = request();
        h.cache
            .put(request.job_query().signature(), items, Duration::from_secs(60))
            .await
            .unwrap();

        let outcome = h.pipeline.run(request).await;

        assert!(outcome.cache_hit);
        assert_eq!(outcome.status, SearchStatus::Matched);
        assert_eq!(outcome.results.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_populates_cache_for_next_run() {
        let h = harness(
            Arc::new(fetcher_returning(records(2), 1)),
            MockEmbeddingProvider::new("mock", 8),
        );

        let first = h.pipeline.run(request()).await;
        let second = h.pipeline.run(request()).await;

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.results, second.results);
    }

    #[tokio::test]
    async fn test_force_refresh_skips_cache() {
        let h = harness(
            Arc::new(fetcher_returning(records(2), 2)),
            MockEmbeddingProvider::new("mock", 8),
        );

        h.pipeline.run(request()).await;
        let outcome = h.pipeline.run(request().with_force_refresh(true)).await;

        assert!(!outcome.cache_hit);
        assert_eq!(outcome.status, SearchStatus::Matched);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_a_status() {
        let mut fetcher = MockJobFetcher::new();
        fetcher.expect_source_name().return_const("mock");
        fetcher
            .expect_fetch()
            .returning(|_| Err(DomainError::fetch_failed("mock", "HTTP 503")));
        let h = harness(Arc::new(fetcher), MockEmbeddingProvider::new("mock", 8));

        let outcome = h.pipeline.run(request()).await;

        assert!(outcome.status.is_degraded());
        assert!(matches!(outcome.status, SearchStatus::FetchFailed { ref message } if message.contains("503")));
        assert!(outcome.results.is_empty());
        assert_eq!(h.cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_failed_cache_write_keeps_fetched_jobs() {
        let h = harness_with_cache(
            Arc::new(fetcher_returning(records(1), 1)),
            MockEmbeddingProvider::new("mock", 8),
            ResultCache::with_config(ResultCacheConfig::default().with_default_ttl(Duration::ZERO)),
        );

        let outcome = h.pipeline.run(request()).await;

        assert_eq!(outcome.status, SearchStatus::Matched);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.fetched, 1);
        assert_eq!(h.cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_empty_fetch_is_no_results() {
        let h = harness(
            Arc::new(fetcher_returning(Vec::new(), 1)),
            MockEmbeddingProvider::new("mock", 8),
        );

        let outcome = h.pipeline.run(request()).await;

        assert_eq!(outcome.status, SearchStatus::NoResults);
        assert!(!outcome.status.is_degraded());
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_a_status() {
        let h = harness(
            Arc::new(fetcher_returning(records(2), 1)),
            MockEmbeddingProvider::new("mock", 8).with_error("invalid api key"),
        );

        let outcome = h.pipeline.run(request()).await;

        assert!(matches!(outcome.status, SearchStatus::EmbeddingUnavailable { .. }));
        assert!(outcome.results.is_empty());
        // the fetch already succeeded, so its records stay cached
        assert_eq!(h.cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_semantic_failure_scores_whole_run_with_string_tier() {
        // index (1 call) and query (1 call) succeed, skill embedding fails
        let h = harness(
            Arc::new(fetcher_returning(records(3), 1)),
            MockEmbeddingProvider::new("mock", 8).fail_after(2),
        );

        let outcome = h.pipeline.run(request()).await;

        assert_eq!(outcome.status, SearchStatus::Matched);
        assert_eq!(outcome.skill_tier, Some(SkillTier::String));
        assert!(outcome.results.iter().all(|r| r.skill_score == Percent::MAX));
    }

    #[tokio::test]
    async fn test_string_tier_when_semantic_disabled() {
        let h = harness(
            Arc::new(fetcher_returning(records(2), 1)),
            MockEmbeddingProvider::new("mock", 8),
        );
        let pipeline = h.pipeline.with_semantic_skills(false);

        let outcome = pipeline.run(request()).await;

        assert_eq!(outcome.skill_tier, Some(SkillTier::String));
        assert!(outcome.results.iter().all(|r| r.missing_skills.is_empty()));
    }

    #[tokio::test]
    async fn test_min_match_score_drops_results() {
        let h = harness(
            Arc::new(fetcher_returning(records(3), 1)),
            MockEmbeddingProvider::new("mock", 8),
        );

        let outcome = h.pipeline.run(request().with_min_match_score(100.1)).await;

        assert_eq!(outcome.status, SearchStatus::NoResults);
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn test_query_vector_is_embedded_once() {
        let h = harness(
            Arc::new(fetcher_returning(records(2), 1)),
            MockEmbeddingProvider::new("mock", 8),
        );
        let pipeline = h.pipeline.with_semantic_skills(false);

        pipeline.run(request()).await;
        let calls = h.provider.calls();
        pipeline.run(request()).await;

        assert_eq!(h.provider.calls(), calls);
    }

    struct SlowFetcher {
        delay: Duration,
        items: Vec<JobRecord>,
    }

    #[async_trait]
    impl JobFetcher for SlowFetcher {
        async fn fetch(&self, _query: &JobQuery) -> Result<Vec<JobRecord>, DomainError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.items.clone())
        }

        fn source_name(&self) -> &'static str {
            "slow"
        }

        async fn health_check(&self) -> Result<(), DomainError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_run_still_caches_fetch() {
        let fetcher = SlowFetcher {
            delay: Duration::from_secs(5),
            items: records(2),
        };
        let h = harness(Arc::new(fetcher), MockEmbeddingProvider::new("mock", 8));
        let signature = request().job_query().signature();
        let pipeline = Arc::new(h.pipeline);

        let run = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.run(request()).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        run.abort();

        tokio::time::sleep(Duration::from_secs(10)).await;

        let entry = h.cache.get(&signature).await.unwrap();
        assert_eq!(entry.items.len(), 2);
    }
}
