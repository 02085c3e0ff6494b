//! Domain layer - job records, scoring policy and collaborator traits

pub mod embedding;
pub mod error;
pub mod fetcher;
pub mod job;
pub mod matching;
pub mod usage;
pub mod vector_store;

pub use embedding::{cosine_similarity, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
pub use error::DomainError;
pub use fetcher::JobFetcher;
pub use job::{JobQuery, JobRecord, SearchSignature};
pub use matching::{MatchBand, MatchResult, Percent, SkillMatch, SkillTier};
pub use usage::{UsageRates, UsageSummary};
pub use vector_store::{ScoredId, StoreKind, VectorEntry, VectorStore};
