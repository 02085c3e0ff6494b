//! Industry keyword filter applied to fetched postings

use crate::domain::job::JobRecord;

const DOMAIN_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "FinTech",
        &["fintech", "financial technology", "blockchain", "crypto", "payment", "banking technology", "digital banking"],
    ),
    (
        "ESG & Sustainability",
        &["esg", "sustainability", "environmental", "green", "carbon", "climate", "renewable"],
    ),
    (
        "Data Analytics",
        &["data analytics", "data analysis", "business intelligence", "bi", "data science", "analytics", "big data"],
    ),
    (
        "Digital Transformation",
        &["digital transformation", "digitalization", "digital strategy", "innovation"],
    ),
    (
        "Investment Banking",
        &["investment banking", "ib", "m&a", "mergers", "acquisitions", "capital markets", "equity research"],
    ),
    (
        "Consulting",
        &["consulting", "consultant", "advisory", "strategy consulting", "management consulting"],
    ),
    (
        "Technology",
        &["software", "technology", "tech", "engineering", "developer", "programming", "it"],
    ),
    (
        "Healthcare",
        &["healthcare", "medical", "health", "hospital", "clinical", "pharmaceutical", "biotech"],
    ),
    (
        "Education",
        &["education", "teaching", "academic", "university", "school", "e-learning", "edtech"],
    ),
    ("Real Estate", &["real estate", "property", "realty", "property management"]),
    ("Retail & E-commerce", &["retail", "e-commerce", "ecommerce", "online retail"]),
    (
        "Marketing & Advertising",
        &["marketing", "advertising", "brand", "digital marketing", "social media"],
    ),
    ("Legal", &["legal", "law", "attorney", "lawyer", "compliance", "regulatory"]),
    (
        "Human Resources",
        &["human resources", "hr", "recruitment", "talent acquisition", "people operations"],
    ),
    ("Operations", &["operations", "supply chain", "logistics", "procurement"]),
];

/// Keyword-based industry filter
pub struct DomainFilter;

impl DomainFilter {
    /// Names of the known domains
    pub fn available_domains() -> Vec<&'static str> {
        DOMAIN_KEYWORDS.iter().map(|(name, _)| *name).collect()
    }

    /// Keep jobs matching any target domain.
    ///
    /// Unknown domain names match on their own lower-cased text. When no job
    /// matches, the input is returned unfiltered.
    pub fn filter(jobs: Vec<JobRecord>, target_domains: &[String]) -> Vec<JobRecord> {
        if target_domains.is_empty() {
            return jobs;
        }

        let keyword_sets: Vec<Vec<String>> = target_domains
            .iter()
            .map(|domain| Self::keywords_for(domain))
            .collect();

        let matching: Vec<JobRecord> = jobs
            .iter()
            .filter(|job| {
                let haystack = format!(
                    "{} {} {}",
                    job.title.to_lowercase(),
                    job.description.to_lowercase(),
                    job.company.to_lowercase()
                );
                keyword_sets
                    .iter()
                    .flatten()
                    .any(|keyword| haystack.contains(keyword.as_str()))
            })
            .cloned()
            .collect();

        if matching.is_empty() { jobs } else { matching }
    }

    fn keywords_for(domain: &str) -> Vec<String> {
        DOMAIN_KEYWORDS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(domain.trim()))
            .map(|(_, keywords)| keywords.iter().map(|k| k.to_string()).collect())
            .unwrap_or_else(|| vec![domain.trim().to_lowercase()])
    }
}
