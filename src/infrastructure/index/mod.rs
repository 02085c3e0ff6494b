//! Deduplicating embedding index over job records
//!
//! Records are keyed by their content hash. A hash is embedded at most once
//! while the index lives: later calls reuse the resident vector, and hashes
//! already present in a durable store are rehydrated without an embedding call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::embedding::rank_by_similarity;
use crate::domain::job::JobRecord;
use crate::domain::vector_store::{StoreKind, VectorEntry, VectorStore};
use crate::domain::DomainError;
use crate::infrastructure::embedding::EmbeddingService;

/// Summary of one `index` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOutcome {
    /// Content hashes of the indexed records, in item order without duplicates
    pub hashes: Vec<String>,
    /// Hashes served from memory or the store
    pub reused: usize,
    /// Hashes that needed an embedding call
    pub embedded: usize,
}

/// A search hit with its cosine similarity
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub hash: String,
    pub record: JobRecord,
    pub score: f32,
}

#[derive(Debug)]
struct Resident {
    record: JobRecord,
    vector: Vec<f32>,
    seq: u64,
}

#[derive(Debug, Default)]
struct IndexState {
    items: HashMap<String, Resident>,
    next_seq: u64,
}

impl IndexState {
    fn insert(&mut self, hash: String, record: JobRecord, vector: Vec<f32>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.insert(
            hash,
            Resident {
                record,
                vector,
                seq,
            },
        );
    }
}

/// Embedding index backed by a pluggable vector store
pub struct EmbeddingIndex {
    store: Arc<dyn VectorStore>,
    state: Mutex<IndexState>,
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex")
            .field("store", &self.store.kind())
            .finish()
    }
}

impl EmbeddingIndex {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            state: Mutex::new(IndexState::default()),
        }
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    /// Index `items`, embedding only hashes not seen before.
    ///
    /// The index lock is held for the whole call, so concurrent callers
    /// indexing the same records never embed a hash twice.
    pub async fn index(
        &self,
        items: &[JobRecord],
        embedder: &EmbeddingService,
    ) -> Result<IndexOutcome, DomainError> {
        let mut state = self.state.lock().await;

        let mut seen = HashSet::new();
        let mut hashes = Vec::with_capacity(items.len());
        let mut unseen: Vec<(String, &JobRecord)> = Vec::new();

        for item in items {
            let hash = item.content_hash();
            if !seen.insert(hash.clone()) {
                continue;
            }
            if !state.items.contains_key(&hash) {
                unseen.push((hash.clone(), item));
            }
            hashes.push(hash);
        }

        let mut reused = hashes.len() - unseen.len();

        // Step 1: rehydrate hashes the store already holds
        if !unseen.is_empty() {
            let ids: Vec<String> = unseen.iter().map(|(hash, _)| hash.clone()).collect();
            match self.store.get_by_ids(&ids).await {
                Ok(mut stored) => {
                    let mut remaining = Vec::with_capacity(unseen.len());
                    for (hash, record) in unseen {
                        match stored.remove(&hash) {
                            Some(entry) => {
                                state.insert(hash, record.clone(), entry.vector);
                                reused += 1;
                            }
                            None => remaining.push((hash, record)),
                        }
                    }
                    unseen = remaining;
                }
                Err(e) => warn!(error = %e, "Vector store lookup failed, embedding locally"),
            }
        }

        // Step 2: embed the remainder in batches
        let embedded = unseen.len();
        if !unseen.is_empty() {
            let texts: Vec<String> = unseen.iter().map(|(_, r)| r.embedding_text()).collect();
            let vectors = embedder.embed_batch(&texts).await?;

            let mut entries = Vec::with_capacity(unseen.len());
            for ((hash, record), vector) in unseen.into_iter().zip(vectors) {
                let metadata = serde_json::to_value(record).unwrap_or(serde_json::Value::Null);
                entries.push(VectorEntry::new(hash.clone(), vector.clone(), metadata));
                state.insert(hash, record.clone(), vector);
            }

            // Step 3: persist; the resident copy stays authoritative on failure
            if let Err(e) = self.store.upsert(entries).await {
                warn!(error = %e, "Vector store upsert failed, keeping vectors in memory");
            }
        }

        info!(
            requested = hashes.len(),
            reused,
            embedded,
            "Indexed job records"
        );

        Ok(IndexOutcome {
            hashes,
            reused,
            embedded,
        })
    }

    /// Rank every stored record by similarity to `query`.
    ///
    /// Falls back to the resident records if the store cannot be queried.
    pub async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>, DomainError> {
        let scored = match self.store.query(query, top_k).await {
            Ok(scored) => scored,
            Err(e) => {
                warn!(error = %e, "Vector store query failed, searching resident records");
                let state = self.state.lock().await;
                let hashes: Vec<String> = state.items.keys().cloned().collect();
                drop(state);
                return Ok(self.search_within(&hashes, query, top_k).await);
            }
        };

        let state = self.state.lock().await;
        let mut hits = Vec::with_capacity(scored.len());
        let mut missing = Vec::new();

        for hit in &scored {
            match state.items.get(&hit.id) {
                Some(resident) => hits.push(Some(SearchHit {
                    hash: hit.id.clone(),
                    record: resident.record.clone(),
                    score: hit.score,
                })),
                None => {
                    missing.push(hit.id.clone());
                    hits.push(None);
                }
            }
        }
        drop(state);

        // records from an earlier process live only in the store metadata
        if !missing.is_empty() {
            let stored = self.store.get_by_ids(&missing).await?;
            for (slot, hit) in hits.iter_mut().zip(&scored) {
                if slot.is_some() {
                    continue;
                }
                let record = stored
                    .get(&hit.id)
                    .and_then(|entry| serde_json::from_value::<JobRecord>(entry.metadata.clone()).ok());
                match record {
                    Some(record) => {
                        *slot = Some(SearchHit {
                            hash: hit.id.clone(),
                            record,
                            score: hit.score,
                        })
                    }
                    None => debug!(id = %hit.id, "Skipping stored vector without record metadata"),
                }
            }
        }

        Ok(hits.into_iter().flatten().collect())
    }

    /// Rank only the resident records named by `hashes`.
    ///
    /// Ties keep the order in which records were first indexed.
    pub async fn search_within(&self, hashes: &[String], query: &[f32], top_k: usize) -> Vec<SearchHit> {
        let state = self.state.lock().await;

        let mut candidates: Vec<(&String, &Resident)> = hashes
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|hash| state.items.get_key_value(hash))
            .collect();
        candidates.sort_by_key(|(_, resident)| resident.seq);

        let ranked = rank_by_similarity(
            query,
            candidates
                .into_iter()
                .map(|(hash, resident)| ((hash, resident), resident.vector.as_slice())),
            top_k,
        );

        ranked
            .into_iter()
            .map(|((hash, resident), score)| SearchHit {
                hash: hash.clone(),
                record: resident.record.clone(),
                score,
            })
            .collect()
    }

    /// Drop every resident record and empty the store
    pub async fn clear(&self) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        state.items.clear();
        self.store.clear().await?;
        info!("Cleared embedding index");
        Ok(())
    }

    /// Number of resident records
    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::vector_store::MockVectorStore;
    use crate::infrastructure::usage::UsageTracker;
    use crate::infrastructure::vector_store::{InMemoryVectorStore, SqliteVectorStore};

    fn embedder(provider: Arc<MockEmbeddingProvider>) -> EmbeddingService {
        EmbeddingService::new(provider, "mock-embedding", Arc::new(UsageTracker::new()))
    }

    fn records(n: usize) -> Vec<JobRecord> {
        (1..=n)
            .map(|i| {
                JobRecord::new(format!("Job {}", i), "Acme", format!("https://jobs/{}", i))
                    .with_description(format!("Role number {}", i))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_second_index_makes_no_embedding_calls() {
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 8));
        let service = embedder(provider.clone());
        let index = EmbeddingIndex::new(Arc::new(InMemoryVectorStore::new()));
        let items = records(4);

        let first = index.index(&items, &service).await.unwrap();
        let calls = provider.calls();
        let second = index.index(&items, &service).await.unwrap();

        assert_eq!(first.embedded, 4);
        assert_eq!(second.embedded, 0);
        assert_eq!(second.reused, 4);
        assert_eq!(provider.calls(), calls);
        assert_eq!(first.hashes, second.hashes);
    }

    #[tokio::test]
    async fn test_duplicate_items_are_embedded_once() {
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 8));
        let index = EmbeddingIndex::new(Arc::new(InMemoryVectorStore::new()));
        let item = records(1).remove(0);

        let outcome = index
            .index(&[item.clone(), item], &embedder(provider.clone()))
            .await
            .unwrap();

        assert_eq!(outcome.hashes.len(), 1);
        assert_eq!(provider.embedded_texts(), 1);
    }

    #[tokio::test]
    async fn test_durable_vectors_are_rehydrated_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        let items = records(3);

        {
            let store = Arc::new(SqliteVectorStore::open(&path).await.unwrap());
            let provider = Arc::new(MockEmbeddingProvider::new("mock", 8));
            EmbeddingIndex::new(store)
                .index(&items, &embedder(provider))
                .await
                .unwrap();
        }

        let store = Arc::new(SqliteVectorStore::open(&path).await.unwrap());
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 8));
        let index = EmbeddingIndex::new(store);

        let outcome = index.index(&items, &embedder(provider.clone())).await.unwrap();

        assert_eq!(outcome.reused, 3);
        assert_eq!(outcome.embedded, 0);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_search_hydrates_records_from_store_metadata() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 8));
        let service = embedder(provider);
        let items = records(2);

        EmbeddingIndex::new(store.clone())
            .index(&items, &service)
            .await
            .unwrap();

        // fresh index over the same store: nothing resident
        let index = EmbeddingIndex::new(store);
        let query = service.embed(&items[0].embedding_text()).await.unwrap();
        let hits = index.search(&query, 1).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record, items[0]);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_empty_index_search_is_empty() {
        let index = EmbeddingIndex::new(Arc::new(InMemoryVectorStore::new()));

        assert!(index.search(&[1.0, 0.0], 5).await.unwrap().is_empty());
        assert!(index.search_within(&[], &[1.0, 0.0], 5).await.is_empty());
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn test_search_within_ties_keep_insertion_order() {
        let items = records(3);
        let provider = MockEmbeddingProvider::new("mock", 2)
            .with_vector(items[0].embedding_text(), vec![1.0, 0.0])
            .with_vector(items[1].embedding_text(), vec![0.0, 1.0])
            .with_vector(items[2].embedding_text(), vec![1.0, 0.0]);
        let index = EmbeddingIndex::new(Arc::new(InMemoryVectorStore::new()));

        let outcome = index.index(&items, &embedder(Arc::new(provider))).await.unwrap();
        let hits = index.search_within(&outcome.hashes, &[1.0, 0.0], 3).await;
        let titles: Vec<&str> = hits.iter().map(|h| h.record.title.as_str()).collect();

        assert_eq!(titles, vec!["Job 1", "Job 3", "Job 2"]);
    }

    #[tokio::test]
    async fn test_search_within_ignores_other_records() {
        let items = records(4);
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 8));
        let index = EmbeddingIndex::new(Arc::new(InMemoryVectorStore::new()));

        index.index(&items, &embedder(provider.clone())).await.unwrap();
        let subset = index.index(&items[..2], &embedder(provider)).await.unwrap();
        let hits = index.search_within(&subset.hashes, &[0.1; 8], 10).await;

        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| subset.hashes.contains(&h.hash)));
    }

    #[tokio::test]
    async fn test_store_failures_keep_indexing_in_memory() {
        let mut store = MockVectorStore::new();
        store.expect_kind().return_const(StoreKind::Durable);
        store
            .expect_get_by_ids()
            .returning(|_| Err(DomainError::storage("disk gone")));
        store
            .expect_upsert()
            .returning(|_| Err(DomainError::storage("disk gone")));

        let provider = Arc::new(MockEmbeddingProvider::new("mock", 8));
        let index = EmbeddingIndex::new(Arc::new(store));
        let items = records(2);

        let outcome = index.index(&items, &embedder(provider)).await.unwrap();
        let hits = index.search_within(&outcome.hashes, &[0.1; 8], 5).await;

        assert_eq!(outcome.embedded, 2);
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 8).with_error("no key"));
        let index = EmbeddingIndex::new(Arc::new(InMemoryVectorStore::new()));

        let result = index.index(&records(1), &embedder(provider)).await;

        assert!(matches!(result, Err(DomainError::EmbeddingUnavailable { .. })));
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear_forces_reembedding() {
        let provider = Arc::new(MockEmbeddingProvider::new("mock", 8));
        let service = embedder(provider.clone());
        let index = EmbeddingIndex::new(Arc::new(InMemoryVectorStore::new()));
        let items = records(2);

        index.index(&items, &service).await.unwrap();
        index.clear().await.unwrap();
        let outcome = index.index(&items, &service).await.unwrap();

        assert_eq!(outcome.embedded, 2);
        assert_eq!(index.len().await, 2);
    }
}
