use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to fetch {url}: {reason}")]
    FetchFailure { url: String, reason: String },

    #[error("page at {url} did not satisfy wait condition {condition}")]
    NotReady { url: String, condition: String },

    #[error("blocked by marketplace bot check at {url}")]
    Blocked { url: String },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("outbound quota exceeded for {key}: {limit} requests per hour")]
    QuotaExceeded { key: String, limit: usize },

    #[error("invalid marketplace base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

impl ScraperError {
    /// Returns `true` for conditions where the caller should back off rather
    /// than treat the marketplace as unreachable: the local hourly quota or a
    /// remote 429.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            ScraperError::QuotaExceeded { .. } | ScraperError::RateLimited { .. }
        )
    }

    /// Returns `true` only for the local hourly quota, which is fatal for a run.
    #[must_use]
    pub fn is_quota(&self) -> bool {
        matches!(self, ScraperError::QuotaExceeded { .. })
    }

    /// Returns `true` for failures worth one retry under a looser wait condition.
    #[must_use]
    pub fn is_navigation_retryable(&self) -> bool {
        matches!(
            self,
            ScraperError::NotReady { .. } | ScraperError::FetchFailure { .. } | ScraperError::Http(_)
        )
    }
}
