//! Vector store implementations

mod factory;
mod in_memory;
mod sqlite;

pub use factory::{select_backend, StoreEnvironment, StoreMode, StoreSelection, VectorStoreFactory};
pub use in_memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;
