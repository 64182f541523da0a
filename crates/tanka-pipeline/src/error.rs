use tanka_extract::ExtractError;
use tanka_scraper::ScraperError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("category '{category}': {source}")]
    Scrape {
        category: String,
        #[source]
        source: ScraperError,
    },

    #[error("failed to build scraper: {0}")]
    ScraperSetup(#[source] ScraperError),

    #[error("failed to build llm client: {0}")]
    LlmSetup(#[from] ExtractError),
}

impl PipelineError {
    pub(crate) fn scrape(category: &str, source: ScraperError) -> Self {
        Self::Scrape {
            category: category.to_string(),
            source,
        }
    }

    /// Returns `true` when the run stopped because the outbound hourly cap
    /// was used up. Later categories in the same process will hit it too.
    #[must_use]
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::Scrape { source, .. } if source.is_quota())
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::Scrape { category, .. } => Some(category),
            Self::ScraperSetup(_) | Self::LlmSetup(_) => None,
        }
    }
}
