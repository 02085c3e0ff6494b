//! Azure OpenAI embeddings. The request model names the deployment.

use async_trait::async_trait;

use super::openai::{decode_reply, request_body};
use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
use crate::domain::DomainError;
use crate::infrastructure::http_client::HttpClientTrait;

pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

#[derive(Debug, Clone)]
pub struct AzureOpenAiConfig {
    /// Resource URL, e.g. `https://myres.openai.azure.com`
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
}

impl AzureOpenAiConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    fn deployment_url(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            self.endpoint, deployment, self.api_version
        )
    }
}

#[derive(Debug)]
pub struct AzureOpenAiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    config: AzureOpenAiConfig,
}

impl<C: HttpClientTrait> AzureOpenAiEmbeddingProvider<C> {
    pub fn new(client: C, config: AzureOpenAiConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for AzureOpenAiEmbeddingProvider<C> {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        let url = self.config.deployment_url(&request.model);
        let headers = vec![
            ("api-key", self.config.api_key.as_str()),
            ("Content-Type", "application/json"),
        ];

        let reply = self
            .client
            .post_json(&url, headers, &request_body(&request, None))
            .await?;

        decode_reply(self.provider_name(), &request.model, reply)
    }

    fn provider_name(&self) -> &'static str {
        "azure_openai"
    }
}
