//! Job source abstraction

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::job::{JobQuery, JobRecord};
use crate::domain::DomainError;

/// External job source.
///
/// One `fetch` is one attempt; retries belong to the implementation's
/// transport, not to callers.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait JobFetcher: Send + Sync {
    /// Fetch postings for the query; an empty list is a valid outcome
    async fn fetch(&self, query: &JobQuery) -> Result<Vec<JobRecord>, DomainError>;

    /// Name used in logs and errors
    fn source_name(&self) -> &'static str;

    /// Cheap connectivity probe
    async fn health_check(&self) -> Result<(), DomainError>;
}
