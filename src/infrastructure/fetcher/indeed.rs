//! Indeed job source via the RapidAPI scraper

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::job::{JobQuery, JobRecord};
use crate::domain::{DomainError, JobFetcher};
use crate::infrastructure::http_client::HttpClientTrait;

const SOURCE_NAME: &str = "indeed";
const MAX_DESCRIPTION_CHARS: usize = 50_000;
const MAX_SKILLS: usize = 10;
const MAX_BENEFITS: usize = 5;

/// Connection settings for the scraper API
#[derive(Debug, Clone)]
pub struct IndeedConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub host: String,
    pub radius: u32,
    pub from_days: u32,
}

impl Default for IndeedConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://indeed-scraper-api.p.rapidapi.com".to_string(),
            host: "indeed-scraper-api.p.rapidapi.com".to_string(),
            radius: 50,
            from_days: 7,
        }
    }
}

impl IndeedConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Fetches postings from the Indeed scraper API
#[derive(Debug)]
pub struct IndeedJobFetcher<C: HttpClientTrait> {
    client: C,
    config: IndeedConfig,
}

impl<C: HttpClientTrait> IndeedJobFetcher<C> {
    pub fn new(client: C, config: IndeedConfig) -> Self {
        Self { client, config }
    }

    fn job_url(&self) -> String {
        format!("{}/api/job", self.config.base_url)
    }

    fn api_key(&self) -> Result<&str, DomainError> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| DomainError::fetch_failed(SOURCE_NAME, "no API key configured"))
    }

    fn build_request(&self, query: &JobQuery) -> Value {
        serde_json::json!({
            "scraper": {
                "maxRows": query.max_results,
                "query": query.query,
                "location": query.location,
                "jobType": query.job_type,
                "radius": self.config.radius.to_string(),
                "sort": "relevance",
                "fromDays": self.config.from_days.to_string(),
                "country": query.country,
            }
        })
    }

    async fn post(&self, query: &JobQuery) -> Result<Value, DomainError> {
        let api_key = self.api_key()?;
        let headers = vec![
            ("x-rapidapi-host", self.config.host.as_str()),
            ("x-rapidapi-key", api_key),
            ("Content-Type", "application/json"),
        ];

        self.client
            .post_json(&self.job_url(), headers, &self.build_request(query))
            .await
            .map_err(|e| DomainError::fetch_failed(SOURCE_NAME, e.to_string()))
    }
}

#[async_trait]
impl<C: HttpClientTrait> JobFetcher for IndeedJobFetcher<C> {
    async fn fetch(&self, query: &JobQuery) -> Result<Vec<JobRecord>, DomainError> {
        debug!(query = %query.query, location = %query.location, "Fetching jobs");

        let response = self.post(query).await?;
        let jobs = parse_jobs(&response)?;

        info!(
            query = %query.query,
            location = %query.location,
            count = jobs.len(),
            "Fetched jobs"
        );
        Ok(jobs)
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        let probe = JobQuery::new("software engineer", "Hong Kong", 1);
        self.post(&probe).await.map(|_| ())
    }
}

/// Parse `returnvalue.data[]` into records; non-object entries are skipped
fn parse_jobs(response: &Value) -> Result<Vec<JobRecord>, DomainError> {
    let data = response
        .get("returnvalue")
        .and_then(|rv| rv.get("data"))
        .ok_or_else(|| DomainError::fetch_failed(SOURCE_NAME, "response has no returnvalue.data"))?;

    let entries = match data {
        Value::Array(entries) => entries,
        Value::Null => return Ok(Vec::new()),
        _ => {
            return Err(DomainError::fetch_failed(
                SOURCE_NAME,
                "returnvalue.data is not a list",
            ))
        }
    };

    Ok(entries.iter().filter_map(parse_job).collect())
}

fn parse_job(job: &Value) -> Option<JobRecord> {
    if !job.is_object() {
        return None;
    }

    let title = string_field(job, "title").unwrap_or_else(|| "Unknown title".to_string());
    let company = string_field(job, "companyName").unwrap_or_else(|| "Unknown company".to_string());
    let url = string_field(job, "jobUrl").unwrap_or_default();

    let location = job
        .get("location")
        .and_then(|loc| string_field(loc, "formattedAddressShort").or_else(|| string_field(loc, "city")))
        .unwrap_or_default();

    let description: String = string_field(job, "descriptionText")
        .unwrap_or_default()
        .chars()
        .take(MAX_DESCRIPTION_CHARS)
        .collect();

    let mut record = JobRecord::new(title, company, url)
        .with_location(location)
        .with_description(description)
        .with_skills(string_list(job, "attributes", MAX_SKILLS))
        .with_benefits(string_list(job, "benefits", MAX_BENEFITS))
        .with_remote(job.get("isRemote").and_then(Value::as_bool).unwrap_or(false));

    if let Some(id) = string_field(job, "jobKey") {
        record = record.with_id(id);
    }
    if let Some(age) = string_field(job, "age") {
        record = record.with_posted_date(age);
    }
    if let Some(rating) = job
        .get("rating")
        .and_then(|r| r.get("rating"))
        .and_then(Value::as_f64)
    {
        record = record.with_company_rating(rating as f32);
    }

    Some(record)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(value: &Value, key: &str, limit: usize) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .take(limit)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
