//! Batched embedding service with usage accounting

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use super::factory::{EmbeddingProviderFactory, EmbeddingServiceConfig};
use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::DomainError;
use crate::infrastructure::usage::UsageTracker;

/// Embeds texts through one provider, splitting large inputs into batches.
///
/// Token usage is recorded per successful provider call, so tokens spent
/// before a later batch fails are still accounted.
#[derive(Debug)]
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    model: String,
    batch_size: usize,
    usage: Arc<UsageTracker>,
}

impl EmbeddingService {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        model: impl Into<String>,
        usage: Arc<UsageTracker>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            batch_size: 16,
            usage,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| DomainError::embedding_unavailable("provider returned no vector"))
    }

    /// One vector per input text, in input order
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let request = EmbeddingRequest::batch(&self.model, chunk.to_vec());
            let response = self.provider.embed(request).await.map_err(|e| {
                DomainError::embedding_unavailable(format!(
                    "{} embedding call failed: {}",
                    self.provider.provider_name(),
                    e
                ))
            })?;

            self.usage
                .add_embedding_tokens(response.usage.prompt_tokens as u64);

            let batch = response.into_ordered_vectors();
            if batch.len() != chunk.len() {
                return Err(DomainError::embedding_unavailable(format!(
                    "expected {} vectors, provider returned {}",
                    chunk.len(),
                    batch.len()
                )));
            }

            debug!(texts = chunk.len(), model = %self.model, "Embedded batch");
            vectors.extend(batch);
        }

        Ok(vectors)
    }
}

/// Get-or-create memo for the embedding service.
///
/// The service is built on first use and shared afterwards. A build
/// failure is returned to the caller and retried on the next request.
#[derive(Debug)]
pub struct LazyEmbedder {
    config: Option<EmbeddingServiceConfig>,
    usage: Arc<UsageTracker>,
    cell: OnceCell<Arc<EmbeddingService>>,
}

impl LazyEmbedder {
    pub fn new(config: EmbeddingServiceConfig, usage: Arc<UsageTracker>) -> Self {
        Self {
            config: Some(config),
            usage,
            cell: OnceCell::new(),
        }
    }

    /// Wrap an already built service
    pub fn from_service(service: Arc<EmbeddingService>) -> Self {
        Self {
            config: None,
            usage: service.usage.clone(),
            cell: OnceCell::new_with(Some(service)),
        }
    }

    pub async fn get(&self) -> Result<Arc<EmbeddingService>, DomainError> {
        self.cell
            .get_or_try_init(|| async { self.build() })
            .await
            .cloned()
    }

    fn build(&self) -> Result<Arc<EmbeddingService>, DomainError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| DomainError::embedding_unavailable("no embedding configuration"))?;

        let provider = EmbeddingProviderFactory::create(config)?;
        let service = EmbeddingService::new(provider, &config.model, self.usage.clone())
            .with_batch_size(config.batch_size);

        Ok(Arc::new(service))
    }
}
