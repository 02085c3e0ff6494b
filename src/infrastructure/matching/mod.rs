//! Two-tier skill matcher

use std::collections::HashMap;
use std::sync::Arc;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::domain::embedding::cosine_similarity;
use crate::domain::matching::{
    assign_greedy, clean_skills, string_match, SkillMatch, SkillTier, SEMANTIC_SKILL_THRESHOLD,
};
use crate::domain::DomainError;
use crate::infrastructure::embedding::EmbeddingService;

type SkillVectors = Arc<HashMap<String, Vec<f32>>>;

/// Matches candidate skills against a job's required skills.
///
/// The semantic tier caches vectors per skill set, with the candidate's set
/// and each job's set held under separate keys. One candidate matched
/// against many jobs embeds its own skills once.
#[derive(Debug, Clone)]
pub struct SkillMatcher {
    threshold: f32,
    skill_vectors: MokaCache<Vec<String>, SkillVectors>,
}

impl Default for SkillMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SkillMatcher {
    pub fn new() -> Self {
        Self {
            threshold: SEMANTIC_SKILL_THRESHOLD,
            skill_vectors: MokaCache::builder().max_capacity(512).build(),
        }
    }

    /// Minimum cosine similarity for a semantic match
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Match with the given tier; the string tier never fails
    pub async fn match_skills(
        &self,
        candidate: &[String],
        required: &[String],
        tier: SkillTier,
        embedder: &EmbeddingService,
    ) -> Result<SkillMatch, DomainError> {
        match tier {
            SkillTier::Semantic => self.match_semantic(candidate, required, embedder).await,
            SkillTier::String => Ok(self.match_strings(candidate, required)),
        }
    }

    pub fn match_strings(&self, candidate: &[String], required: &[String]) -> SkillMatch {
        string_match(&clean_skills(candidate), &clean_skills(required))
    }

    pub async fn match_semantic(
        &self,
        candidate: &[String],
        required: &[String],
        embedder: &EmbeddingService,
    ) -> Result<SkillMatch, DomainError> {
        let candidate = clean_skills(candidate);
        let required = clean_skills(required);

        if required.is_empty() || candidate.is_empty() {
            let flags = vec![false; required.len()];
            return Ok(SkillMatch::from_flags(&required, &flags, SkillTier::Semantic));
        }

        let candidate_vectors = self.set_vectors(&candidate, embedder).await?;
        let required_vectors = self.set_vectors(&required, embedder).await?;

        let similarity: Vec<Vec<f32>> = required
            .iter()
            .map(|req| {
                let req_vector = vector_of(&required_vectors, req);
                candidate
                    .iter()
                    .map(|cand| cosine_similarity(req_vector, vector_of(&candidate_vectors, cand)))
                    .collect()
            })
            .collect();

        let flags: Vec<bool> = assign_greedy(&similarity, self.threshold)
            .iter()
            .map(Option::is_some)
            .collect();

        Ok(SkillMatch::from_flags(&required, &flags, SkillTier::Semantic))
    }

    /// Vectors for one skill set, keyed by its sorted distinct members
    async fn set_vectors(
        &self,
        skills: &[String],
        embedder: &EmbeddingService,
    ) -> Result<SkillVectors, DomainError> {
        let mut key: Vec<String> = skills.to_vec();
        key.sort();
        key.dedup();

        if let Some(vectors) = self.skill_vectors.get(&key).await {
            debug!(skills = key.len(), "Skill vectors cache hit");
            return Ok(vectors);
        }

        let embedded = embedder.embed_batch(&key).await?;
        let vectors: SkillVectors = Arc::new(key.iter().cloned().zip(embedded).collect());
        self.skill_vectors.insert(key, vectors.clone()).await;

        Ok(vectors)
    }
}

fn vector_of<'a>(vectors: &'a HashMap<String, Vec<f32>>, skill: &str) -> &'a [f32] {
    vectors.get(skill).map(Vec::as_slice).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::infrastructure::usage::UsageTracker;

    fn skills(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn embedder(provider: Arc<MockEmbeddingProvider>) -> EmbeddingService {
        EmbeddingService::new(provider, "mock-embedding", Arc::new(UsageTracker::new()))
    }

    fn synonym_provider() -> MockEmbeddingProvider {
        MockEmbeddingProvider::new("mock", 3)
            .with_vector("Python", vec![1.0, 0.0, 0.0])
            .with_vector("python programming", vec![0.95, 0.05, 0.0])
            .with_vector("SQL", vec![0.0, 1.0, 0.0])
            .with_vector("PostgreSQL", vec![0.1, 0.9, 0.0])
            .with_vector("React", vec![0.0, 0.0, 1.0])
            .with_vector("Docker", vec![0.5, -0.5, 0.2])
    }

    #[tokio::test]
    async fn test_semantic_tier_matches_related_skills() {
        let matcher = SkillMatcher::new();
        let service = embedder(Arc::new(synonym_provider()));

        let result = matcher
            .match_semantic(
                &skills(&["python programming", "PostgreSQL"]),
                &skills(&["Python", "SQL", "React", "Docker"]),
                &service,
            )
            .await
            .unwrap();

        assert_eq!(result.score, 0.5);
        assert_eq!(result.matched, skills(&["Python", "SQL"]));
        assert_eq!(result.missing, skills(&["React", "Docker"]));
        assert_eq!(result.tier, SkillTier::Semantic);
    }

    #[tokio::test]
    async fn test_candidate_used_at_most_once() {
        let provider = MockEmbeddingProvider::new("mock", 2)
            .with_vector("Python", vec![1.0, 0.0])
            .with_vector("Py", vec![1.0, 0.0])
            .with_vector("python", vec![1.0, 0.01]);
        let matcher = SkillMatcher::new();

        let result = matcher
            .match_semantic(
                &skills(&["python"]),
                &skills(&["Python", "Py"]),
                &embedder(Arc::new(provider)),
            )
            .await
            .unwrap();

        assert_eq!(result.matched, skills(&["Python"]));
        assert_eq!(result.missing, skills(&["Py"]));
    }

    #[tokio::test]
    async fn test_repeated_skill_sets_are_embedded_once() {
        let provider = Arc::new(synonym_provider());
        let service = embedder(provider.clone());
        let matcher = SkillMatcher::new();
        let candidate = skills(&["Python"]);
        let required = skills(&["SQL", "React"]);

        matcher.match_semantic(&candidate, &required, &service).await.unwrap();
        matcher.match_semantic(&candidate, &required, &service).await.unwrap();

        assert_eq!(provider.calls(), 2);
        assert_eq!(provider.embedded_texts(), 3);
    }

    #[tokio::test]
    async fn test_candidate_skills_embedded_once_across_jobs() {
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 4));
        let service = embedder(provider.clone());
        let matcher = SkillMatcher::new();
        let candidate = skills(&["Python", "SQL", "Spark"]);

        for job_skill in ["Excel", "Tableau", "Airflow", "dbt", "Kafka"] {
            matcher
                .match_semantic(&candidate, &skills(&[job_skill]), &service)
                .await
                .unwrap();
        }

        assert_eq!(provider.embedded_texts(), 3 + 5);
        assert_eq!(provider.calls(), 1 + 5);
    }

    #[tokio::test]
    async fn test_skill_order_does_not_split_the_cache() {
        let provider = Arc::new(synonym_provider());
        let service = embedder(provider.clone());
        let matcher = SkillMatcher::new();

        matcher
            .match_semantic(&skills(&["Python", "SQL"]), &skills(&["React"]), &service)
            .await
            .unwrap();
        matcher
            .match_semantic(&skills(&["SQL", "Python"]), &skills(&["React"]), &service)
            .await
            .unwrap();

        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_inputs_skip_embedding() {
        let provider = Arc::new(synonym_provider());
        let service = embedder(provider.clone());
        let matcher = SkillMatcher::new();

        let no_required = matcher
            .match_semantic(&skills(&["Python"]), &[], &service)
            .await
            .unwrap();
        let no_candidate = matcher
            .match_semantic(&[], &skills(&["SQL", " "]), &service)
            .await
            .unwrap();

        assert_eq!(no_required.score, 0.0);
        assert!(no_required.missing.is_empty());
        assert_eq!(no_candidate.missing, skills(&["SQL"]));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_semantic_failure_is_embedding_unavailable() {
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 3).with_error("boom"));
        let matcher = SkillMatcher::new();

        let result = matcher
            .match_semantic(&skills(&["Python"]), &skills(&["SQL"]), &embedder(provider))
            .await;

        assert!(matches!(result, Err(DomainError::EmbeddingUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_string_tier_via_match_skills() {
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 3).with_error("unused"));
        let matcher = SkillMatcher::new();

        let result = matcher
            .match_skills(
                &skills(&["python", "sql"]),
                &skills(&["Python", "SQL", "React", "Docker"]),
                SkillTier::String,
                &embedder(provider.clone()),
            )
            .await
            .unwrap();

        assert_eq!(result.score, 0.5);
        assert_eq!(result.missing, skills(&["React", "Docker"]));
        assert_eq!(provider.calls(), 0);
    }
}
