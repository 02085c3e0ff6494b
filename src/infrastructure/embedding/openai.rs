//! OpenAI `/v1/embeddings`, plus the wire shapes Azure shares with it

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::embedding::{
    Embedding, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage,
};
use crate::domain::DomainError;
use crate::infrastructure::http_client::HttpClientTrait;

const OPENAI_API_BASE: &str = "https://api.openai.com";

#[derive(Debug)]
pub struct OpenAiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    bearer: String,
    endpoint: String,
}

impl<C: HttpClientTrait> OpenAiEmbeddingProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, OPENAI_API_BASE)
    }

    /// Point at an OpenAI-compatible server instead of api.openai.com
    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base = base_url.into();
        Self {
            client,
            bearer: format!("Bearer {}", api_key.into()),
            endpoint: format!("{}/v1/embeddings", base.trim_end_matches('/')),
        }
    }
}

/// JSON body for an embeddings call. Azure takes the model from the
/// deployment URL, so it passes `None`.
pub(super) fn request_body(request: &EmbeddingRequest, model: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({ "input": request.texts });

    if let Some(model) = model {
        body["model"] = model.into();
    }
    if let Some(dimensions) = request.dimensions {
        body["dimensions"] = dimensions.into();
    }

    body
}

/// Decode a `{data, usage}` reply into the neutral response
pub(super) fn decode_reply(
    provider: &str,
    requested_model: &str,
    json: serde_json::Value,
) -> Result<EmbeddingResponse, DomainError> {
    let reply: WireReply = serde_json::from_value(json).map_err(|e| {
        DomainError::provider(provider, format!("unreadable embeddings reply: {}", e))
    })?;

    Ok(EmbeddingResponse {
        model: reply.model.unwrap_or_else(|| requested_model.to_string()),
        embeddings: reply
            .data
            .into_iter()
            .map(|item| Embedding {
                position: item.index,
                values: item.embedding,
            })
            .collect(),
        usage: reply.usage.map(EmbeddingUsage::from).unwrap_or_default(),
    })
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OpenAiEmbeddingProvider<C> {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        let body = request_body(&request, Some(&request.model));
        let headers = vec![
            ("Authorization", self.bearer.as_str()),
            ("Content-Type", "application/json"),
        ];

        let reply = self.client.post_json(&self.endpoint, headers, &body).await?;

        decode_reply(self.provider_name(), &request.model, reply)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[derive(Deserialize)]
struct WireReply {
    #[serde(default)]
    model: Option<String>,
    data: Vec<WireVector>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireVector {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    total_tokens: u32,
}

impl From<WireUsage> for EmbeddingUsage {
    fn from(usage: WireUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}
