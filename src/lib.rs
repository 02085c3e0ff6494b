//! CareerLens match engine
//!
//! Matches a candidate profile against job postings from an external search
//! API while keeping the expensive dependencies in check:
//! - Sliding-window rate limiting and TTL result caching for job searches
//! - Incremental, deduplicating embedding index over fetched postings
//! - Explainable match scores blending semantic similarity and skill overlap

pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::DomainError;
pub use engine::{MatchEngine, StoreStatus};
pub use infrastructure::cache::CacheInvalidation;
pub use infrastructure::pipeline::{
    CandidateProfile, IndexPolicy, SearchOutcome, SearchRequest, SearchStatus,
};
