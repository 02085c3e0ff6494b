//! Token and cost accounting types

mod pricing;

use std::collections::BTreeMap;

use serde::Serialize;

pub use pricing::{
    UsageRates, CHAT_COMPLETION_COST_PER_1K, CHAT_PROMPT_COST_PER_1K, EMBEDDING_COST_PER_1K,
};

/// Per-model running token counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl ModelUsage {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Read-only snapshot of the usage counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub total_tokens: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub embedding_tokens: u64,
    pub cost_usd: f64,
    pub by_model: BTreeMap<String, ModelUsage>,
}

impl UsageSummary {
    /// Cost rounded to four decimals for display
    pub fn display_cost(&self) -> String {
        format!("${:.4}", self.cost_usd)
    }
}
