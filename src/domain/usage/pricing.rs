//! Token pricing used for cost accounting

use serde::{Deserialize, Serialize};

/// USD per 1K tokens for embedding models
pub const EMBEDDING_COST_PER_1K: f64 = 0.00002;

/// USD per 1K prompt tokens for chat models (gpt-4o-mini)
pub const CHAT_PROMPT_COST_PER_1K: f64 = 0.00015;

/// USD per 1K completion tokens for chat models (gpt-4o-mini)
pub const CHAT_COMPLETION_COST_PER_1K: f64 = 0.0006;

/// Fixed per-1K rates, selected by whether a model is an embedding model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageRates {
    pub embedding_per_1k: f64,
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

impl Default for UsageRates {
    fn default() -> Self {
        Self {
            embedding_per_1k: EMBEDDING_COST_PER_1K,
            prompt_per_1k: CHAT_PROMPT_COST_PER_1K,
            completion_per_1k: CHAT_COMPLETION_COST_PER_1K,
        }
    }
}

impl UsageRates {
    /// Whether the model name denotes an embedding model
    pub fn is_embedding_model(model: &str) -> bool {
        model.to_lowercase().contains("embedding")
    }

    /// Cost in USD for one call
    pub fn cost(&self, model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        if Self::is_embedding_model(model) {
            return (prompt_tokens + completion_tokens) as f64 / 1000.0 * self.embedding_per_1k;
        }

        prompt_tokens as f64 / 1000.0 * self.prompt_per_1k
            + completion_tokens as f64 / 1000.0 * self.completion_per_1k
    }

    /// Cost in USD for tokens spent on embeddings
    pub fn embedding_cost(&self, tokens: u64) -> f64 {
        tokens as f64 / 1000.0 * self.embedding_per_1k
    }
}
