use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::cache::ResultCacheConfig;
use crate::infrastructure::embedding::{EmbeddingProviderKind, EmbeddingServiceConfig};
use crate::infrastructure::fetcher::IndeedConfig;
use crate::infrastructure::vector_store::{StoreEnvironment, StoreMode};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub rate_limit: RateLimitSettings,
    pub cache: CacheSettings,
    pub embedding: EmbeddingSettings,
    pub fetcher: FetcherSettings,
    pub vector_store: VectorStoreSettings,
    pub matching: MatchingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Outbound job search admission
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_calls: u32,
    pub window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_calls: 10,
            window_secs: 60,
        }
    }
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_hours: u64,
    pub max_capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_hours: 168,
            max_capacity: 1_000,
        }
    }
}

/// Ten years
const MAX_CACHE_TTL_HOURS: u64 = 87_600;

impl CacheSettings {
    pub fn cache_config(&self) -> ResultCacheConfig {
        ResultCacheConfig::default()
            .with_max_capacity(self.max_capacity)
            .with_default_ttl(Duration::from_secs(self.ttl_hours.saturating_mul(3600)))
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.ttl_hours == 0 || self.ttl_hours > MAX_CACHE_TTL_HOURS {
            return Err(config::ConfigError::Message(format!(
                "cache.ttl_hours must be between 1 and {}, got {}",
                MAX_CACHE_TTL_HOURS, self.ttl_hours
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_api_version: String,
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        let defaults = EmbeddingServiceConfig::default();
        Self {
            provider: defaults.provider,
            model: defaults.model,
            api_key: None,
            base_url: None,
            azure_endpoint: None,
            azure_api_version: defaults.azure_api_version,
            batch_size: defaults.batch_size,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

impl EmbeddingSettings {
    pub fn service_config(&self) -> EmbeddingServiceConfig {
        EmbeddingServiceConfig {
            provider: self.provider,
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            azure_endpoint: self.azure_endpoint.clone(),
            azure_api_version: self.azure_api_version.clone(),
            batch_size: self.batch_size,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Job source connection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub host: String,
    pub radius: u32,
    pub from_days: u32,
    pub timeout_secs: u64,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        let defaults = IndeedConfig::default();
        Self {
            api_key: None,
            base_url: defaults.base_url,
            host: defaults.host,
            radius: defaults.radius,
            from_days: defaults.from_days,
            timeout_secs: 60,
        }
    }
}

impl FetcherSettings {
    pub fn indeed_config(&self) -> IndeedConfig {
        IndeedConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.trim_end_matches('/').to_string(),
            host: self.host.clone(),
            radius: self.radius,
            from_days: self.from_days,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub mode: StoreMode,
    pub path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            mode: StoreMode::Auto,
            path: "data/job_index.db".to_string(),
        }
    }
}

impl VectorStoreSettings {
    /// Probe the host for the backend choice
    pub fn environment(&self) -> StoreEnvironment {
        StoreEnvironment::detect(self.mode, &self.path)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    pub semantic_skills: bool,
    pub skill_similarity_threshold: f32,
    pub top_k: usize,
    pub index_multiplier: usize,
    pub max_index: Option<usize>,
    pub min_match_score: f32,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            semantic_skills: true,
            skill_similarity_threshold: 0.70,
            top_k: 15,
            index_multiplier: 2,
            max_index: None,
            min_match_score: 0.0,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("CAREERLENS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        app.apply_key_fallbacks(|name| std::env::var(name).ok());

        Ok(app)
    }

    /// Reject settings every search would trip over
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.cache.validate()
    }

    /// Fill missing API keys from the providers' conventional variables
    pub fn apply_key_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.embedding.api_key.is_none() {
            let name = match self.embedding.provider {
                EmbeddingProviderKind::OpenAi => "OPENAI_API_KEY",
                EmbeddingProviderKind::Azure => "AZURE_OPENAI_API_KEY",
            };
            self.embedding.api_key = lookup(name).filter(|key| !key.trim().is_empty());
        }

        if self.embedding.azure_endpoint.is_none()
            && self.embedding.provider == EmbeddingProviderKind::Azure
        {
            self.embedding.azure_endpoint = lookup("AZURE_OPENAI_ENDPOINT");
        }

        if self.fetcher.api_key.is_none() {
            self.fetcher.api_key = lookup("RAPIDAPI_KEY").filter(|key| !key.trim().is_empty());
        }
    }
}
