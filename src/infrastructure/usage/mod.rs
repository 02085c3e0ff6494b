//! Token usage tracker

use std::sync::{Mutex, MutexGuard};

use crate::domain::usage::{ModelUsage, UsageRates, UsageSummary};

/// Running token and cost counters shared by every component that calls a
/// paid model.
#[derive(Debug, Default)]
pub struct UsageTracker {
    rates: UsageRates,
    counters: Mutex<UsageSummary>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rates(rates: UsageRates) -> Self {
        Self {
            rates,
            counters: Mutex::new(UsageSummary::default()),
        }
    }

    /// Record one model call
    pub fn add_usage(&self, model: &str, prompt_tokens: u64, completion_tokens: u64) {
        let cost = self.rates.cost(model, prompt_tokens, completion_tokens);
        let mut counters = self.lock();

        counters.prompt_tokens += prompt_tokens;
        counters.completion_tokens += completion_tokens;
        counters.total_tokens += prompt_tokens + completion_tokens;
        counters.cost_usd += cost;

        let per_model = counters.by_model.entry(model.to_string()).or_default();
        per_model.prompt_tokens += prompt_tokens;
        per_model.completion_tokens += completion_tokens;
    }

    /// Record tokens spent on embeddings
    pub fn add_embedding_tokens(&self, tokens: u64) {
        let cost = self.rates.embedding_cost(tokens);
        let mut counters = self.lock();

        counters.embedding_tokens += tokens;
        counters.total_tokens += tokens;
        counters.cost_usd += cost;
    }

    pub fn summary(&self) -> UsageSummary {
        self.lock().clone()
    }

    pub fn model_usage(&self, model: &str) -> Option<ModelUsage> {
        self.lock().by_model.get(model).copied()
    }

    pub fn reset(&self) {
        *self.lock() = UsageSummary::default();
    }

    // Counters stay consistent after a panic elsewhere; keep accounting.
    fn lock(&self) -> MutexGuard<'_, UsageSummary> {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
