//! Marketplace search client.
//!
//! [`MarketplaceScraper`] drives one search: it asks the outbound gate for a
//! slot, navigates with a bounded wait strategy, parses each result page and
//! collects de-duplicated [`RawListing`]s.

pub mod url;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tanka_core::{AppConfig, RawListing};

use crate::error::ScraperError;
use crate::fetch::{extract_domain, HttpFetcher, PageFetcher, WaitCondition};
use crate::parse::parse_search_page;
use crate::rate_limit::OutboundGate;

use self::url::{marketplace_origin, search_url};

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    /// Navigation timeout; always finite.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Result pages fetched per search, at least 1.
    pub max_pages: u32,
}

impl ScraperConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.marketplace_base_url.clone(),
            timeout_secs: config.scraper_timeout_secs,
            user_agent: config.scraper_user_agent.clone(),
            max_pages: config.scraper_max_pages,
        }
    }
}

/// Search client for one marketplace.
///
/// Every navigation, including the single loose-wait retry, goes through the
/// shared [`OutboundGate`] under the marketplace host as session key.
pub struct MarketplaceScraper<F = HttpFetcher> {
    fetcher: F,
    gate: Arc<OutboundGate>,
    origin: String,
    session_key: String,
    max_pages: u32,
}

impl MarketplaceScraper<HttpFetcher> {
    /// Creates a scraper backed by [`HttpFetcher`].
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBaseUrl`] for an unusable base URL, or
    /// [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ScraperConfig, gate: Arc<OutboundGate>) -> Result<Self, ScraperError> {
        let fetcher = HttpFetcher::new(config.timeout_secs, &config.user_agent)?;
        Self::with_fetcher(fetcher, &config.base_url, config.max_pages, gate)
    }
}

impl<F: PageFetcher> MarketplaceScraper<F> {
    /// Creates a scraper around any [`PageFetcher`].
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBaseUrl`] for an unusable base URL.
    pub fn with_fetcher(
        fetcher: F,
        base_url: &str,
        max_pages: u32,
        gate: Arc<OutboundGate>,
    ) -> Result<Self, ScraperError> {
        let origin = marketplace_origin(base_url)?;
        let session_key = extract_domain(&origin);
        Ok(Self {
            fetcher,
            gate,
            origin,
            session_key,
            max_pages: max_pages.max(1),
        })
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Searches the marketplace for `keyword`.
    ///
    /// Zero results is `Ok(vec![])`. Listings keep page order; an id seen on
    /// an earlier page is dropped from later pages.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::QuotaExceeded`]: the outbound hourly cap is used up.
    /// - [`ScraperError::FetchFailure`] / [`ScraperError::RateLimited`]: a page
    ///   could not be loaded even after the loose-wait retry.
    /// - [`ScraperError::Blocked`]: the marketplace served a bot check.
    pub async fn search(&self, keyword: &str) -> Result<Vec<RawListing>, ScraperError> {
        let mut listings = Vec::new();
        let mut seen = HashSet::new();

        for page in 1..=self.max_pages {
            let url = search_url(&self.origin, keyword, page)?;
            let html = self.navigate(&url).await?;
            let parsed = parse_search_page(&html, &self.origin, Utc::now())?;

            let cards = parsed.listings.len() + parsed.skipped;
            let before = listings.len();
            for listing in parsed.listings {
                if seen.insert(listing.source_id.clone()) {
                    listings.push(listing);
                }
            }
            tracing::info!(
                keyword,
                page,
                added = listings.len() - before,
                skipped = parsed.skipped,
                "parsed search results page"
            );

            if cards == 0 || !parsed.has_next {
                break;
            }
        }

        Ok(listings)
    }

    /// Loads `url` under the strict wait condition, retrying exactly once
    /// under the loose one.
    async fn navigate(&self, url: &str) -> Result<String, ScraperError> {
        self.gate.wait(&self.session_key).await?;
        match self.fetcher.fetch(url, WaitCondition::ResultsRendered).await {
            Ok(html) => Ok(html),
            Err(e) if e.is_navigation_retryable() => {
                tracing::warn!(url, error = %e, "strict navigation failed, retrying with loose wait");
                self.gate.wait(&self.session_key).await?;
                self.fetcher.fetch(url, WaitCondition::DocumentLoaded).await
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
