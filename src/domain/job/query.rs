//! Search parameters and the normalized cache signature derived from them

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_JOB_TYPE: &str = "fulltime";
pub const DEFAULT_COUNTRY: &str = "hk";

/// Raw search parameters as handed to a job source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobQuery {
    pub query: String,
    pub location: String,
    pub max_results: u32,
    pub job_type: String,
    pub country: String,
}

impl JobQuery {
    pub fn new(query: impl Into<String>, location: impl Into<String>, max_results: u32) -> Self {
        Self {
            query: query.into(),
            location: location.into(),
            max_results,
            job_type: DEFAULT_JOB_TYPE.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
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

    pub fn signature(&self) -> SearchSignature {
        SearchSignature::build(
            &self.query,
            &self.location,
            self.max_results,
            &self.job_type,
            &self.country,
        )
    }
}

/// Normalized search parameters used as the result cache key.
///
/// String fields are trimmed and lower-cased so near-identical queries
/// share one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchSignature {
    query: String,
    location: String,
    max_results: u32,
    job_type: String,
    country: String,
}

impl SearchSignature {
    pub fn build(
        query: &str,
        location: &str,
        max_results: u32,
        job_type: &str,
        country: &str,
    ) -> Self {
        Self {
            query: normalize(query),
            location: normalize(location),
            max_results,
            job_type: normalize(job_type),
            country: normalize(country),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn max_results(&self) -> u32 {
        self.max_results
    }
}

impl fmt::Display for SearchSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} in {:?} ({}, {}, {})",
            self.query, self.location, self.max_results, self.job_type, self.country
        )
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
