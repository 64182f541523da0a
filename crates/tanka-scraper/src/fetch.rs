//! Page fetching behind a wait-condition contract.
//!
//! A [`PageFetcher`] loads a URL and returns its HTML once the requested
//! [`WaitCondition`] holds. [`HttpFetcher`] is the plain-HTTP implementation;
//! a headless-browser fetcher plugs in behind the same trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::ScraperError;

/// Markers that only appear once the search results list is in the markup.
const RESULTS_MARKERS: &[&str] = &[
    "data-component-type=\"s-search-result\"",
    "data-component-type='s-search-result'",
    "s-main-slot",
    "s-result-list",
];

/// How much of a page must be loaded before a navigation counts as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// The search results container is present.
    ResultsRendered,
    /// Any successful document body.
    DocumentLoaded,
}

impl WaitCondition {
    /// Returns `true` if `html` satisfies this condition.
    #[must_use]
    pub fn is_satisfied(self, html: &str) -> bool {
        match self {
            WaitCondition::ResultsRendered => RESULTS_MARKERS.iter().any(|m| html.contains(m)),
            WaitCondition::DocumentLoaded => true,
        }
    }
}

impl std::fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitCondition::ResultsRendered => write!(f, "results-rendered"),
            WaitCondition::DocumentLoaded => write!(f, "document-loaded"),
        }
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Loads `url` and returns the page HTML once `condition` holds.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::FetchFailure`] for network failures and
    /// non-success statuses, [`ScraperError::RateLimited`] for HTTP 429, and
    /// [`ScraperError::NotReady`] when the page loaded but never met `condition`.
    async fn fetch(&self, url: &str, condition: WaitCondition) -> Result<String, ScraperError>;
}

/// Fetches pages over HTTP with a browser-like request profile.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a finite request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, condition: WaitCondition) -> Result<String, ScraperError> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "ja-JP,ja;q=0.9,en;q=0.5")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| ScraperError::FetchFailure {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ScraperError::RateLimited {
                domain: extract_domain(url),
                retry_after_secs,
            });
        }
        if !status.is_success() {
            return Err(ScraperError::FetchFailure {
                url: url.to_owned(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScraperError::FetchFailure {
                url: url.to_owned(),
                reason: format!("failed to read body: {e}"),
            })?;

        if !condition.is_satisfied(&body) {
            return Err(ScraperError::NotReady {
                url: url.to_owned(),
                condition: condition.to_string(),
            });
        }

        Ok(body)
    }
}

/// Extracts the hostname from a URL for use in error messages and gate keys.
///
/// Falls back to the full URL string if parsing fails.
pub(crate) fn extract_domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_rendered_requires_marker() {
        assert!(WaitCondition::ResultsRendered
            .is_satisfied(r#"<div class="s-main-slot"><div data-component-type="s-search-result"></div></div>"#));
        assert!(!WaitCondition::ResultsRendered.is_satisfied("<html><body>loading</body></html>"));
    }

    #[test]
    fn document_loaded_accepts_any_body() {
        assert!(WaitCondition::DocumentLoaded.is_satisfied(""));
    }

    #[test]
    fn extract_domain_returns_host() {
        assert_eq!(
            extract_domain("https://www.amazon.co.jp/s?k=rice"),
            "www.amazon.co.jp"
        );
    }

    #[test]
    fn extract_domain_falls_back_to_input() {
        assert_eq!(extract_domain("not a url"), "not a url");
    }
}
