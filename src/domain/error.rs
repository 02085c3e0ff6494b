use thiserror::Error;

/// Errors raised anywhere in the engine.
///
/// The first four variants are the match engine's own failure modes. The
/// pipeline turns `FetchFailed` and `EmbeddingUnavailable` into a search
/// status instead of returning them. The rest are plumbing failures from
/// providers, stores and settings.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    #[error("Fetch from {source_name} failed: {message}")]
    FetchFailed {
        source_name: String,
        message: String,
    },

    #[error("Embeddings unavailable: {message}")]
    EmbeddingUnavailable { message: String },

    #[error("Vector store degraded: {message}")]
    IndexStoreDegraded { message: String },

    #[error("{provider} call failed: {message}")]
    Provider { provider: String, message: String },

    #[error("Invalid value: {message}")]
    Validation { message: String },

    #[error("Bad configuration: {message}")]
    Configuration { message: String },

    #[error("Storage failure: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    pub fn fetch_failed(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn embedding_unavailable(message: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable {
            message: message.into(),
        }
    }

    pub fn index_store_degraded(message: impl Into<String>) -> Self {
        Self::IndexStoreDegraded {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn is_embedding_failure(&self) -> bool {
        matches!(self, Self::EmbeddingUnavailable { .. })
    }
}
