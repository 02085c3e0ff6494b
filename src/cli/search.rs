//! Search command - one match search from the command line

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::domain::job::{DEFAULT_COUNTRY, DEFAULT_JOB_TYPE};
use crate::domain::matching::MatchResult;
use crate::domain::usage::UsageSummary;
use crate::engine::MatchEngine;
use crate::infrastructure::pipeline::{CandidateProfile, SearchOutcome};

/// Arguments for the search command
#[derive(Args, Clone, Debug)]
pub struct SearchArgs {
    /// Candidate's primary role, e.g. "Data Scientist"
    #[arg(long)]
    pub role: String,

    /// Candidate skills, comma separated
    #[arg(long, value_delimiter = ',')]
    pub skills: Vec<String>,

    /// Free-text profile summary
    #[arg(long)]
    pub summary: Option<String>,

    /// Read the profile summary from a file
    #[arg(long, conflicts_with = "summary")]
    pub summary_file: Option<PathBuf>,

    /// Search keywords (defaults to the role)
    #[arg(long)]
    pub keywords: Option<String>,

    #[arg(long, default_value = "Hong Kong")]
    pub location: String,

    #[arg(long, default_value_t = 25)]
    pub max_results: u32,

    /// Minimum combined score, as 0-100 or a 0-1 fraction (overrides config)
    #[arg(long)]
    pub min_score: Option<f32>,

    #[arg(long, default_value = DEFAULT_JOB_TYPE)]
    pub job_type: String,

    #[arg(long, default_value = DEFAULT_COUNTRY)]
    pub country: String,

    /// Keep only jobs in these industry domains, comma separated
    #[arg(long, value_delimiter = ',')]
    pub domains: Vec<String>,

    /// Number of ranked results (overrides config)
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Ignore cached search results
    #[arg(long)]
    pub force_refresh: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: SearchArgs) -> anyhow::Result<()> {
    let config = super::bootstrap();
    let engine = MatchEngine::from_config(&config).await?;

    let summary = match (&args.summary, &args.summary_file) {
        (_, Some(path)) => std::fs::read_to_string(path)?,
        (Some(summary), None) => summary.clone(),
        (None, None) => String::new(),
    };

    let profile = CandidateProfile::new(&args.role)
        .with_skills(args.skills.iter().map(|s| s.trim()).filter(|s| !s.is_empty()))
        .with_summary(summary);
    let keywords = args.keywords.clone().unwrap_or_else(|| args.role.clone());

    let mut request = engine
        .request(profile, keywords, &args.location, args.max_results)
        .with_job_type(&args.job_type)
        .with_country(&args.country)
        .with_force_refresh(args.force_refresh)
        .with_target_domains(args.domains.clone());
    if let Some(min_score) = args.min_score {
        request = request.with_min_match_score(min_score);
    }
    if let Some(top_k) = args.top_k {
        request.policy.top_k = top_k;
    }

    let outcome = engine.search(request).await;
    let usage = engine.usage_summary();

    info!(
        status = ?outcome.status,
        results = outcome.results.len(),
        "Search finished"
    );

    if args.json {
        let body = serde_json::json!({ "outcome": outcome, "usage": usage });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print_outcome(&outcome);
        print_usage(&usage);
    }

    Ok(())
}

fn print_outcome(outcome: &SearchOutcome) {
    if outcome.results.is_empty() {
        println!("{}", outcome.status.user_message());
        return;
    }

    let source = if outcome.cache_hit { "cached" } else { "fresh" };
    println!(
        "{} matches from {} {} postings ({} indexed)\n",
        outcome.results.len(),
        outcome.fetched,
        source,
        outcome.indexed
    );

    for result in &outcome.results {
        print_result(result);
    }
}

fn print_result(result: &MatchResult) {
    let record = &result.record;

    println!(
        "#{:<3} {:>5.1}  {}  {} @ {}",
        result.rank,
        result.combined_score.value(),
        result.band.label(),
        record.title,
        record.company
    );
    if !record.location.is_empty() {
        println!("      {}", record.location);
    }
    println!(
        "      semantic {:.1} | skills {:.1}",
        result.semantic_score.value(),
        result.skill_score.value()
    );
    if !result.matched_skills.is_empty() {
        println!("      matched: {}", result.matched_skills.join(", "));
    }
    if !result.missing_skills.is_empty() {
        println!("      missing: {}", result.missing_skills.join(", "));
    }
    println!("      {}\n", record.url);
}

fn print_usage(usage: &UsageSummary) {
    println!(
        "usage: {} tokens ({} embedding), cost {}",
        usage.total_tokens,
        usage.embedding_tokens,
        usage.display_cost()
    );
}
