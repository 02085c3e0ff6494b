//! Match scoring policy and result types

mod domain_filter;
mod score;
mod skills;

use serde::Serialize;

use crate::domain::job::JobRecord;

pub use domain_filter::DomainFilter;
pub use score::{combine, MatchBand, Percent, SEMANTIC_WEIGHT, SKILL_WEIGHT};
pub use skills::{
    assign_greedy, clean_skills, string_match, SkillMatch, SkillTier, MAX_MISSING_SKILLS,
    SEMANTIC_SKILL_THRESHOLD,
};

/// One ranked, explainable match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub record: JobRecord,
    pub semantic_score: Percent,
    pub skill_score: Percent,
    pub combined_score: Percent,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    /// 1-based position in the ranked list
    pub rank: usize,
    pub band: MatchBand,
}

impl MatchResult {
    /// Score a hit; `rank` is assigned later by [`rank_results`]
    pub fn new(record: JobRecord, cosine: f32, skills: SkillMatch) -> Self {
        let semantic_score = Percent::from_unit(cosine);
        let skill_score = Percent::from_unit(skills.score);
        let combined_score = combine(semantic_score, skill_score);

        Self {
            record,
            semantic_score,
            skill_score,
            combined_score,
            matched_skills: skills.matched,
            missing_skills: skills.missing,
            rank: 0,
            band: MatchBand::from_score(combined_score),
        }
    }
}

/// Stable sort by combined score descending and assign 1-based ranks
pub fn rank_results(mut results: Vec<MatchResult>) -> Vec<MatchResult> {
    results.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for (idx, result) in results.iter_mut().enumerate() {
        result.rank = idx + 1;
    }

    results
}
