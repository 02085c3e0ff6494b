//! Search request and outcome types

use serde::{Deserialize, Serialize};

use crate::domain::job::{JobQuery, DEFAULT_COUNTRY, DEFAULT_JOB_TYPE};
use crate::domain::matching::{MatchResult, Percent, SkillTier};

/// Skills taken from the profile into the query text
pub const QUERY_SKILL_COUNT: usize = 20;

/// Summary characters taken into the query text
pub const QUERY_SUMMARY_CHARS: usize = 1000;

/// The candidate side of a match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub primary_role: String,
    pub skills: Vec<String>,
    /// Free-text profile (resume summary, experience)
    pub summary: String,
}

impl CandidateProfile {
    pub fn new(primary_role: impl Into<String>) -> Self {
        Self {
            primary_role: primary_role.into(),
            ..Default::default()
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Text embedded to query the index
    pub fn query_text(&self) -> String {
        let skills = self
            .skills
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .take(QUERY_SKILL_COUNT)
            .collect::<Vec<_>>()
            .join(", ");
        let summary: String = self.summary.trim().chars().take(QUERY_SUMMARY_CHARS).collect();

        [self.primary_role.trim(), skills.as_str(), summary.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(". ")
    }
}

/// Recall/cost trade-off for one search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPolicy {
    /// Results returned
    pub top_k: usize,
    /// Records indexed per desired result
    pub multiplier: usize,
    /// Hard cap on records indexed
    pub max_index: Option<usize>,
}

impl Default for IndexPolicy {
    fn default() -> Self {
        Self {
            top_k: 15,
            multiplier: 2,
            max_index: None,
        }
    }
}

impl IndexPolicy {
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            ..Default::default()
        }
    }

    pub fn with_multiplier(mut self, multiplier: usize) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_index(mut self, max_index: usize) -> Self {
        self.max_index = Some(max_index);
        self
    }

    /// How many of `available` records to index
    pub fn index_limit(&self, available: usize) -> usize {
        let desired = self.top_k.saturating_mul(self.multiplier.max(1));
        desired
            .min(self.max_index.unwrap_or(usize::MAX))
            .min(available)
    }
}

/// One search against the engine
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub profile: CandidateProfile,
    pub keywords: String,
    pub location: String,
    pub max_results: u32,
    pub job_type: String,
    pub country: String,
    /// Results below this combined score are dropped
    pub min_match_score: Percent,
    /// Skip the cache read; the fresh result still replaces the entry
    pub force_refresh: bool,
    pub target_domains: Vec<String>,
    pub policy: IndexPolicy,
}

impl SearchRequest {
    pub fn new(
        profile: CandidateProfile,
        keywords: impl Into<String>,
        location: impl Into<String>,
        max_results: u32,
    ) -> Self {
        Self {
            profile,
            keywords: keywords.into(),
            location: location.into(),
            max_results,
            job_type: DEFAULT_JOB_TYPE.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            min_match_score: Percent::ZERO,
            force_refresh: false,
            target_domains: Vec::new(),
            policy: IndexPolicy::default(),
        }
    }

    pub fn with_job_type(mut self, job_type: impl Into<String>) -> Self {
        self.job_type = job_type.into();
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Accepts either scale: `0.7` and `70.0` both mean 70%
    pub fn with_min_match_score(mut self, score: f32) -> Self {
        self.min_match_score = Percent::detect(score);
        self
    }

    pub fn with_force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn with_target_domains(mut self, domains: Vec<String>) -> Self {
        self.target_domains = domains;
        self
    }

    pub fn with_policy(mut self, policy: IndexPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The fetcher query for this request
    pub fn job_query(&self) -> JobQuery {
        JobQuery::new(&self.keywords, &self.location, self.max_results)
            .with_job_type(&self.job_type)
            .with_country(&self.country)
    }
}

/// How a search ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchStatus {
    Matched,
    /// A valid, empty outcome
    NoResults,
    FetchFailed { message: String },
    EmbeddingUnavailable { message: String },
}

impl SearchStatus {
    /// The service could not do its job, as opposed to finding nothing
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::FetchFailed { .. } | Self::EmbeddingUnavailable { .. })
    }

    /// Message suitable for showing to the end user
    pub fn user_message(&self) -> String {
        match self {
            Self::Matched => "Ranked matches are ready.".to_string(),
            Self::NoResults => {
                "No jobs matched this search. Try broader keywords, another location or a lower minimum score."
                    .to_string()
            }
            Self::FetchFailed { message } => format!(
                "The job search service is unavailable right now ({}). Please try again later.",
                message
            ),
            Self::EmbeddingUnavailable { message } => format!(
                "Matching is temporarily unavailable ({}). Check the embedding API key and try again.",
                message
            ),
        }
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    #[serde(flatten)]
    pub status: SearchStatus,
    pub results: Vec<MatchResult>,
    pub cache_hit: bool,
    /// Tier used to score every result of this run
    pub skill_tier: Option<SkillTier>,
    /// Records available after fetch (or cache) and domain filtering
    pub fetched: usize,
    /// Records handed to the index
    pub indexed: usize,
}

impl SearchOutcome {
    pub(super) fn empty(status: SearchStatus, cache_hit: bool) -> Self {
        Self {
            status,
            results: Vec::new(),
            cache_hit,
            skill_tier: None,
            fetched: 0,
            indexed: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
