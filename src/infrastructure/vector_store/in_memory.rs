//! Volatile vector store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::embedding::rank_by_similarity;
use crate::domain::vector_store::{ScoredId, StoreKind, VectorEntry, VectorStore};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct Entries {
    /// Ids in first-insertion order
    order: Vec<String>,
    by_id: HashMap<String, VectorEntry>,
}

/// Process-memory vector store; contents are lost on restart
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<Entries>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Volatile
    }

    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<(), DomainError> {
        let mut guard = self.entries.write().await;

        for entry in entries {
            if !guard.by_id.contains_key(&entry.id) {
                guard.order.push(entry.id.clone());
            }
            guard.by_id.insert(entry.id.clone(), entry);
        }

        Ok(())
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<HashMap<String, VectorEntry>, DomainError> {
        let guard = self.entries.read().await;

        Ok(ids
            .iter()
            .filter_map(|id| guard.by_id.get(id).map(|entry| (id.clone(), entry.clone())))
            .collect())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredId>, DomainError> {
        let guard = self.entries.read().await;

        let candidates = guard
            .order
            .iter()
            .filter_map(|id| guard.by_id.get(id))
            .map(|entry| (entry.id.as_str(), entry.vector.as_slice()));

        Ok(rank_by_similarity(vector, candidates, top_k)
            .into_iter()
            .map(|(id, score)| ScoredId {
                id: id.to_string(),
                score,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.entries.read().await.order.len())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut guard = self.entries.write().await;
        guard.order.clear();
        guard.by_id.clear();
        Ok(())
    }
}
