//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, CacheSettings, EmbeddingSettings, FetcherSettings, LogFormat, LoggingConfig,
    MatchingSettings, RateLimitSettings, VectorStoreSettings,
};
