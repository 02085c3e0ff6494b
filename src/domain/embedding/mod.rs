//! Embedding calls, providers and vector similarity

mod provider;
mod similarity;
mod types;

pub use provider::EmbeddingProvider;
pub use similarity::{cosine_similarity, rank_by_similarity};
pub use types::{Embedding, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage};

#[cfg(test)]
pub use provider::mock::MockEmbeddingProvider;
