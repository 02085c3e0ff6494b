//! Embedding provider implementations

mod azure;
mod factory;
mod openai;
mod service;

pub use azure::{AzureOpenAiConfig, AzureOpenAiEmbeddingProvider};
pub use factory::{EmbeddingProviderFactory, EmbeddingProviderKind, EmbeddingServiceConfig};
pub use openai::OpenAiEmbeddingProvider;
pub use service::{EmbeddingService, LazyEmbedder};
