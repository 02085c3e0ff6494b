//! Infrastructure layer - concrete components and external service clients

pub mod cache;
pub mod embedding;
pub mod fetcher;
pub mod http_client;
pub mod index;
pub mod logging;
pub mod matching;
pub mod pipeline;
pub mod rate_limit;
pub mod usage;
pub mod vector_store;
