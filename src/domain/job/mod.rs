//! Job postings and search parameters

mod query;
mod record;

pub use query::{JobQuery, SearchSignature, DEFAULT_COUNTRY, DEFAULT_JOB_TYPE};
pub use record::{dedup_skills, JobRecord, EMBEDDING_DESCRIPTION_CHARS, EMBEDDING_SKILL_COUNT};
