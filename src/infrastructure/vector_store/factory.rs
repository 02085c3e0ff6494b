//! Vector store selection

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::in_memory::InMemoryVectorStore;
use super::sqlite::SqliteVectorStore;
use crate::domain::vector_store::{StoreKind, VectorStore};
use crate::domain::DomainError;

/// Requested backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// Durable unless the host filesystem is ephemeral
    #[default]
    Auto,
    Durable,
    Volatile,
}

impl std::str::FromStr for StoreMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "durable" | "sqlite" => Ok(Self::Durable),
            "volatile" | "memory" | "in_memory" => Ok(Self::Volatile),
            _ => Err(DomainError::configuration(format!(
                "Unknown vector store mode: {}. Valid modes: auto, durable, volatile",
                s
            ))),
        }
    }
}

/// Snapshot of everything the backend choice depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEnvironment {
    pub mode: StoreMode,
    pub path: PathBuf,
    /// Local files do not outlive the process (hosted notebooks, sandboxes)
    pub ephemeral_host: bool,
}

impl StoreEnvironment {
    pub fn new(mode: StoreMode, path: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            path: path.into(),
            ephemeral_host: false,
        }
    }

    pub fn with_ephemeral_host(mut self, ephemeral: bool) -> Self {
        self.ephemeral_host = ephemeral;
        self
    }

    /// Read the host hints from the process environment
    pub fn detect(mode: StoreMode, path: impl Into<PathBuf>) -> Self {
        let var = |name: &str| std::env::var(name).ok();
        let ephemeral = is_ephemeral_host(
            var("CAREERLENS_EPHEMERAL_FS").is_some(),
            var("STREAMLIT_SHARING_MODE").is_some() || var("STREAMLIT_SERVER_PORT").is_some(),
            var("HOSTNAME").as_deref(),
        );

        Self::new(mode, path).with_ephemeral_host(ephemeral)
    }
}

fn is_ephemeral_host(flagged: bool, hosted_app: bool, hostname: Option<&str>) -> bool {
    flagged || hosted_app || hostname.is_some_and(|h| h.contains("streamlit.app"))
}

/// Which backend to build for an environment
pub fn select_backend(env: &StoreEnvironment) -> StoreKind {
    match env.mode {
        StoreMode::Durable => StoreKind::Durable,
        StoreMode::Volatile => StoreKind::Volatile,
        StoreMode::Auto if env.ephemeral_host => StoreKind::Volatile,
        StoreMode::Auto => StoreKind::Durable,
    }
}

/// The store that was built and why it may differ from the request
pub struct StoreSelection {
    pub store: Arc<dyn VectorStore>,
    pub kind: StoreKind,
    /// Set when the durable backend failed and volatile was used instead
    pub degraded: Option<DomainError>,
}

impl std::fmt::Debug for StoreSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSelection")
            .field("kind", &self.kind)
            .field("degraded", &self.degraded)
            .finish()
    }
}

/// Factory for vector stores; never fails, falling back to volatile
pub struct VectorStoreFactory;

impl VectorStoreFactory {
    pub async fn create(env: &StoreEnvironment) -> StoreSelection {
        match select_backend(env) {
            StoreKind::Volatile => Self::volatile(None),
            StoreKind::Durable => match SqliteVectorStore::open(&env.path).await {
                Ok(store) => {
                    info!(path = %env.path.display(), "Using durable vector store");
                    StoreSelection {
                        store: Arc::new(store),
                        kind: StoreKind::Durable,
                        degraded: None,
                    }
                }
                Err(e) => {
                    let degraded = DomainError::index_store_degraded(e.to_string());
                    info!(
                        path = %env.path.display(),
                        reason = %degraded,
                        "Durable vector store unavailable, using volatile store"
                    );
                    Self::volatile(Some(degraded))
                }
            },
        }
    }

    fn volatile(degraded: Option<DomainError>) -> StoreSelection {
        StoreSelection {
            store: Arc::new(InMemoryVectorStore::new()),
            kind: StoreKind::Volatile,
            degraded,
        }
    }
}
