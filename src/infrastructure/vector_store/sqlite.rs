//! Durable vector store backed by a local SQLite file

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::domain::embedding::rank_by_similarity;
use crate::domain::vector_store::{ScoredId, StoreKind, VectorEntry, VectorStore};
use crate::domain::DomainError;

/// SQLite caps bound parameters per statement
const MAX_IDS_PER_QUERY: usize = 500;

/// Vectors and metadata stored as JSON text, ranked in process.
///
/// `seq` records first insertion; upserts update in place so a record
/// keeps its position for tie-breaking.
#[derive(Debug, Clone)]
pub struct SqliteVectorStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteVectorStore {
    /// Open (creating if needed) the store at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::storage(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| {
                DomainError::storage(format!("Failed to open {}: {}", path.display(), e))
            })?;

        let store = Self {
            pool,
            path: path.to_path_buf(),
        };
        store.ensure_table().await?;

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_vectors (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                vector TEXT NOT NULL,
                metadata TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create table: {}", e)))?;

        Ok(())
    }
}

fn decode_vector(raw: &str) -> Result<Vec<f32>, DomainError> {
    serde_json::from_str(raw)
        .map_err(|e| DomainError::storage(format!("Corrupt vector column: {}", e)))
}

fn storage_err(context: &str) -> impl Fn(sqlx::Error) -> DomainError + '_ {
    move |e| DomainError::storage(format!("{}: {}", context, e))
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Durable
    }

    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<(), DomainError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_err("Failed to begin transaction"))?;

        for entry in &entries {
            let vector = serde_json::to_string(&entry.vector)
                .map_err(|e| DomainError::internal(format!("Failed to encode vector: {}", e)))?;

            sqlx::query(
                r#"
                INSERT INTO job_vectors (id, vector, metadata)
                VALUES (?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    vector = excluded.vector,
                    metadata = excluded.metadata
                "#,
            )
            .bind(entry.id.as_str())
            .bind(vector)
            .bind(entry.metadata.to_string())
            .execute(&mut *tx)
            .await
            .map_err(storage_err("Failed to upsert vector"))?;
        }

        tx.commit()
            .await
            .map_err(storage_err("Failed to commit vectors"))
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<HashMap<String, VectorEntry>, DomainError> {
        let mut found = HashMap::new();

        for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT id, vector, metadata FROM job_vectors WHERE id IN ({})",
                placeholders
            );

            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(id.as_str());
            }

            let rows = query
                .fetch_all(&self.pool)
                .await
                .map_err(storage_err("Failed to read vectors"))?;

            for row in rows {
                let id: String = row.try_get("id").map_err(storage_err("Bad id column"))?;
                let vector: String = row.try_get("vector").map_err(storage_err("Bad vector column"))?;
                let metadata: String = row
                    .try_get("metadata")
                    .map_err(storage_err("Bad metadata column"))?;

                let metadata = serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null);
                let entry = VectorEntry::new(id.clone(), decode_vector(&vector)?, metadata);
                found.insert(id, entry);
            }
        }

        Ok(found)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredId>, DomainError> {
        let rows = sqlx::query("SELECT id, vector FROM job_vectors ORDER BY seq")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err("Failed to scan vectors"))?;

        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id").map_err(storage_err("Bad id column"))?;
            let raw: String = row.try_get("vector").map_err(storage_err("Bad vector column"))?;
            stored.push((id, decode_vector(&raw)?));
        }

        let candidates = stored.iter().map(|(id, v)| (id.as_str(), v.as_slice()));

        Ok(rank_by_similarity(vector, candidates, top_k)
            .into_iter()
            .map(|(id, score)| ScoredId {
                id: id.to_string(),
                score,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_vectors")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err("Failed to count vectors"))?;

        Ok(count.max(0) as usize)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM job_vectors")
            .execute(&self.pool)
            .await
            .map_err(storage_err("Failed to clear vectors"))?;

        Ok(())
    }
}
