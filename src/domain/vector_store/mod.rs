//! Vector store capability shared by the durable and volatile backends

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A stored vector with its metadata payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: serde_json::Value,
}

impl VectorEntry {
    pub fn new(id: impl Into<String>, vector: Vec<f32>, metadata: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            vector,
            metadata,
        }
    }
}

/// Query hit: id plus cosine similarity
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredId {
    pub id: String,
    pub score: f32,
}

/// Which backend a store is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Survives restarts (local SQLite file)
    Durable,
    /// Process memory only
    Volatile,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Durable => write!(f, "durable"),
            Self::Volatile => write!(f, "volatile"),
        }
    }
}

/// Keyed vector storage with cosine ranking.
///
/// Upserting an existing id replaces its vector and metadata but keeps its
/// insertion position, which `query` uses to break score ties.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<(), DomainError>;

    /// Entries for the ids that exist; unknown ids are simply absent
    async fn get_by_ids(&self, ids: &[String]) -> Result<HashMap<String, VectorEntry>, DomainError>;

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredId>, DomainError>;

    async fn count(&self) -> Result<usize, DomainError>;

    async fn clear(&self) -> Result<(), DomainError>;
}
