//! Provider-neutral embedding call shapes

/// A batch of texts sent to the provider in one call
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRequest {
    pub model: String,
    pub texts: Vec<String>,
    /// Shortened vector size, honoured by text-embedding-3 models only
    pub dimensions: Option<usize>,
}

impl EmbeddingRequest {
    pub fn batch(model: impl Into<String>, texts: Vec<String>) -> Self {
        Self {
            model: model.into(),
            texts,
            dimensions: None,
        }
    }

    pub fn single(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::batch(model, vec![text.into()])
    }

    pub fn shortened_to(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// A vector plus the position of its text in the request
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub position: usize,
    pub values: Vec<f32>,
}

/// Tokens billed for one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbeddingUsage {
    pub prompt_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct EmbeddingResponse {
    pub model: String,
    pub embeddings: Vec<Embedding>,
    pub usage: EmbeddingUsage,
}

impl EmbeddingResponse {
    /// Providers may answer out of order; this restores request order
    pub fn into_ordered_vectors(mut self) -> Vec<Vec<f32>> {
        self.embeddings.sort_by_key(|e| e.position);
        self.embeddings.into_iter().map(|e| e.values).collect()
    }
}
