//! Embedding provider factory for runtime selection

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::azure::{AzureOpenAiConfig, AzureOpenAiEmbeddingProvider, DEFAULT_AZURE_API_VERSION};
use super::openai::OpenAiEmbeddingProvider;
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::DomainError;
use crate::infrastructure::http_client::HttpClient;

/// Supported embedding backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    OpenAi,
    Azure,
}

impl std::fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Azure => write!(f, "azure"),
        }
    }
}

impl std::str::FromStr for EmbeddingProviderKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "azure" | "azure_openai" => Ok(Self::Azure),
            _ => Err(DomainError::configuration(format!(
                "Unknown embedding provider: {}. Valid providers: openai, azure",
                s
            ))),
        }
    }
}

/// Everything needed to build an embedding service
#[derive(Debug, Clone)]
pub struct EmbeddingServiceConfig {
    pub provider: EmbeddingProviderKind,
    /// Model name (OpenAI) or deployment name (Azure)
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_api_version: String,
    pub batch_size: usize,
    pub timeout: Duration,
}

impl Default for EmbeddingServiceConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::OpenAi,
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            base_url: None,
            azure_endpoint: None,
            azure_api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            batch_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl EmbeddingServiceConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Factory for creating embedding providers from configuration
pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {
    pub fn create(
        config: &EmbeddingServiceConfig,
    ) -> Result<Arc<dyn EmbeddingProvider>, DomainError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                DomainError::embedding_unavailable(format!(
                    "no API key configured for {} embeddings",
                    config.provider
                ))
            })?;

        let client = HttpClient::with_timeout(config.timeout)?;

        let provider: Arc<dyn EmbeddingProvider> = match config.provider {
            EmbeddingProviderKind::OpenAi => match &config.base_url {
                Some(base_url) => Arc::new(OpenAiEmbeddingProvider::with_base_url(
                    client, api_key, base_url,
                )),
                None => Arc::new(OpenAiEmbeddingProvider::new(client, api_key)),
            },
            EmbeddingProviderKind::Azure => {
                let endpoint = config.azure_endpoint.as_deref().ok_or_else(|| {
                    DomainError::embedding_unavailable("azure embeddings need an endpoint")
                })?;
                let azure = AzureOpenAiConfig::new(endpoint, api_key)
                    .with_api_version(&config.azure_api_version);

                Arc::new(AzureOpenAiEmbeddingProvider::new(client, azure))
            }
        };

        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("OpenAI".parse::<EmbeddingProviderKind>().unwrap(), EmbeddingProviderKind::OpenAi);
        assert_eq!("azure_openai".parse::<EmbeddingProviderKind>().unwrap(), EmbeddingProviderKind::Azure);
        assert!("cohere".parse::<EmbeddingProviderKind>().is_err());
    }

    #[test]
    fn test_missing_key_is_embedding_unavailable() {
        let result = EmbeddingProviderFactory::create(&EmbeddingServiceConfig::default());
        assert!(matches!(result, Err(DomainError::EmbeddingUnavailable { .. })));
    }

    #[test]
    fn test_azure_requires_endpoint() {
        let config = EmbeddingServiceConfig {
            provider: EmbeddingProviderKind::Azure,
            ..EmbeddingServiceConfig::default()
        }
        .with_api_key("key");

        assert!(EmbeddingProviderFactory::create(&config).is_err());
    }

    #[test]
    fn test_openai_provider_created() {
        let config = EmbeddingServiceConfig::default().with_api_key("key");
        let provider = EmbeddingProviderFactory::create(&config).unwrap();

        assert_eq!(provider.provider_name(), "openai");
    }
}
