//! Skill overlap policies shared by both matcher tiers

use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimum cosine similarity for a semantic skill match
pub const SEMANTIC_SKILL_THRESHOLD: f32 = 0.70;

/// Missing skills reported per match
pub const MAX_MISSING_SKILLS: usize = 5;

/// Which matching strategy produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillTier {
    Semantic,
    String,
}

impl fmt::Display for SkillTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semantic => write!(f, "semantic"),
            Self::String => write!(f, "string"),
        }
    }
}

/// Outcome of matching a candidate's skills against a job's requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatch {
    /// Fraction of required skills matched, in `[0, 1]`
    pub score: f32,
    /// Required skills that matched, in input order
    pub matched: Vec<String>,
    /// Unmatched required skills, first five in input order
    pub missing: Vec<String>,
    pub tier: SkillTier,
}

impl SkillMatch {
    /// Build from a per-required-skill match flag
    pub fn from_flags(required: &[String], flags: &[bool], tier: SkillTier) -> Self {
        let mut matched = Vec::new();
        let mut missing = Vec::new();

        for (skill, &hit) in required.iter().zip(flags) {
            if hit {
                matched.push(skill.clone());
            } else {
                missing.push(skill.clone());
            }
        }

        let score = matched.len() as f32 / required.len().max(1) as f32;
        missing.truncate(MAX_MISSING_SKILLS);

        Self {
            score,
            matched,
            missing,
            tier,
        }
    }
}

/// Trim and drop blank skills
pub fn clean_skills<S: AsRef<str>>(skills: &[S]) -> Vec<String> {
    skills
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Case-insensitive substring containment in either direction
pub fn string_match(candidate: &[String], required: &[String]) -> SkillMatch {
    let candidate: Vec<String> = candidate.iter().map(|s| s.to_lowercase()).collect();

    let flags: Vec<bool> = required
        .iter()
        .map(|req| {
            let req = req.to_lowercase();
            candidate
                .iter()
                .any(|cand| cand.contains(&req) || req.contains(cand.as_str()))
        })
        .collect();

    SkillMatch::from_flags(required, &flags, SkillTier::String)
}

/// Greedy assignment over a required x candidate similarity matrix.
///
/// Required skills are visited in order; each takes its best remaining
/// candidate when that similarity reaches `threshold`, removing the
/// candidate from the pool. Returns the assigned candidate per required skill.
pub fn assign_greedy(similarity: &[Vec<f32>], threshold: f32) -> Vec<Option<usize>> {
    let candidates = similarity.first().map_or(0, Vec::len);
    let mut taken = vec![false; candidates];

    similarity
        .iter()
        .map(|row| {
            let best = row
                .iter()
                .enumerate()
                .filter(|(idx, _)| !taken[*idx])
                .fold(None, |best: Option<(usize, f32)>, (idx, &score)| match best {
                    Some((_, top)) if top >= score => best,
                    _ => Some((idx, score)),
                });

            match best {
                Some((idx, score)) if score >= threshold => {
                    taken[idx] = true;
                    Some(idx)
                }
                _ => None,
            }
        })
        .collect()
}
