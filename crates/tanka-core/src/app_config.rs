use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// A `(max_requests, window)` pair for one inbound operation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundLimit {
    pub max_requests: usize,
    pub window: Duration,
}

/// Text-generation endpoint used by the optional LLM extraction pass.
#[derive(Clone)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API, e.g. `"http://localhost:11434"`.
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub categories_path: PathBuf,
    pub marketplace_base_url: String,
    pub scraper_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_min_interval_ms: u64,
    pub scraper_max_interval_ms: u64,
    pub scraper_hourly_cap: usize,
    pub scraper_max_pages: u32,
    pub max_concurrent_categories: usize,
    pub inbound_read: InboundLimit,
    pub inbound_refetch: InboundLimit,
    pub inbound_rescrape: InboundLimit,
    /// `None` disables the LLM extraction pass.
    pub llm: Option<LlmConfig>,
}
