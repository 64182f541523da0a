//! Marketplace search scraping behind an outbound request gate.
//!
//! [`MarketplaceScraper::search`] turns a keyword into [`tanka_core::RawListing`]s:
//! it waits on the [`OutboundGate`], navigates with a strict-then-loose wait
//! strategy, and extracts each result card with prioritized selector lists.

pub mod client;
pub mod error;
pub mod fetch;
pub mod parse;
pub mod rate_limit;
pub mod selectors;

mod parse_helpers;

pub use client::{MarketplaceScraper, ScraperConfig};
pub use error::ScraperError;
pub use fetch::{HttpFetcher, PageFetcher, WaitCondition};
pub use parse::{parse_search_page, SearchPage};
pub use rate_limit::{OutboundGate, OutboundGateConfig};
