//! Job posting record

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Maximum description characters folded into the embedding text
pub const EMBEDDING_DESCRIPTION_CHARS: usize = 2000;

/// Skills included in the embedding text
pub const EMBEDDING_SKILL_COUNT: usize = 5;

/// A single job posting as returned by a job source.
///
/// Records are immutable once fetched; the cache and the index hand out
/// clones, never mutate in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    /// Distinct skills in source order
    pub skills: Vec<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub is_remote: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_rating: Option<f32>,
}

impl JobRecord {
    /// Create a record with the identifying fields; the id defaults to the content hash
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let mut record = Self {
            id: String::new(),
            title: title.into(),
            company: company.into(),
            location: String::new(),
            description: String::new(),
            skills: Vec::new(),
            url: url.into(),
            posted_date: None,
            benefits: Vec::new(),
            is_remote: false,
            company_rating: None,
        };
        record.id = record.content_hash();
        record
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set skills, dropping blanks and case-insensitive duplicates
    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = dedup_skills(skills);
        self
    }

    pub fn with_posted_date(mut self, posted_date: impl Into<String>) -> Self {
        self.posted_date = Some(posted_date.into());
        self
    }

    pub fn with_benefits(mut self, benefits: Vec<String>) -> Self {
        self.benefits = benefits;
        self
    }

    pub fn with_remote(mut self, is_remote: bool) -> Self {
        self.is_remote = is_remote;
        self
    }

    pub fn with_company_rating(mut self, rating: f32) -> Self {
        self.company_rating = Some(rating);
        self
    }

    /// Stable dedup key derived from title, company and url
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}_{}_{}", self.title, self.company, self.url).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Text submitted to the embedder for this record
    pub fn embedding_text(&self) -> String {
        let description: String = self
            .description
            .chars()
            .take(EMBEDDING_DESCRIPTION_CHARS)
            .collect();
        let skills = self
            .skills
            .iter()
            .take(EMBEDDING_SKILL_COUNT)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{} at {}. {} Skills: {}",
            self.title, self.company, description, skills
        )
    }
}

/// Trim, drop blanks and remove case-insensitive duplicates, keeping first occurrence order
pub fn dedup_skills<I, S>(skills: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = std::collections::HashSet::new();
    skills
        .into_iter()
        .map(|s| s.into().trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}
