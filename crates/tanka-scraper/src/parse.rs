//! Search result page parsing.
//!
//! Turns one page of marketplace search HTML into [`RawListing`] records.
//! Cards without a valid identifier or title are skipped with a warning;
//! every other field is optional and left `None` when no strategy matches.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use tanka_core::RawListing;

use crate::client::url::product_url;
use crate::error::ScraperError;
use crate::parse_helpers::{
    absolutize, is_valid_source_id, parse_count, parse_price, parse_rating, source_id_from_href,
};
use crate::selectors::{self, first_match, first_parsed};

/// Listings parsed from one search result page.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Listings in page order, de-duplicated by `source_id`.
    pub listings: Vec<RawListing>,
    /// `true` when the page links to a further result page.
    pub has_next: bool,
    /// Number of cards rejected for a missing or invalid identifier or title.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardRejection {
    MissingId,
    MalformedId,
    EmptyTitle,
}

impl CardRejection {
    fn as_str(self) -> &'static str {
        match self {
            CardRejection::MissingId => "missing id",
            CardRejection::MalformedId => "malformed id",
            CardRejection::EmptyTitle => "empty title",
        }
    }
}

/// Parses a search result page.
///
/// An empty result list is a valid page and yields an empty [`SearchPage`].
///
/// # Errors
///
/// Returns [`ScraperError::Blocked`] if the page is the marketplace's bot-check
/// interstitial instead of search results.
pub fn parse_search_page(
    html: &str,
    base_url: &str,
    fetched_at: DateTime<Utc>,
) -> Result<SearchPage, ScraperError> {
    let document = Html::parse_document(html);

    if document.select(&selectors::CAPTCHA).next().is_some() {
        return Err(ScraperError::Blocked {
            url: base_url.to_string(),
        });
    }

    let mut page = SearchPage {
        has_next: document.select(&selectors::NEXT_PAGE).next().is_some(),
        ..SearchPage::default()
    };
    let mut seen = HashSet::new();

    for card in document.select(&selectors::RESULT_CARD) {
        match parse_card(card, base_url, fetched_at) {
            Ok(listing) => {
                if seen.insert(listing.source_id.clone()) {
                    page.listings.push(listing);
                }
            }
            Err(reason) => {
                tracing::warn!(reason = reason.as_str(), "skipping search result card");
                page.skipped += 1;
            }
        }
    }

    Ok(page)
}

fn parse_card(
    card: ElementRef<'_>,
    base_url: &str,
    fetched_at: DateTime<Utc>,
) -> Result<RawListing, CardRejection> {
    let source_id = card_source_id(card).ok_or(CardRejection::MissingId)?;
    if !is_valid_source_id(&source_id) {
        return Err(CardRejection::MalformedId);
    }

    let title = first_match(&selectors::TITLE, card).ok_or(CardRejection::EmptyTitle)?;

    let link = first_match(&selectors::PRODUCT_LINK, card)
        .map(|href| absolutize(base_url, &href))
        .or_else(|| Some(product_url(base_url, &source_id)));

    Ok(RawListing {
        title,
        description: None,
        price: first_parsed(&selectors::PRICE, card, parse_price),
        regular_price: first_parsed(&selectors::REGULAR_PRICE, card, parse_price),
        rating_avg: first_parsed(&selectors::RATING, card, parse_rating),
        rating_count: first_parsed(&selectors::RATING_COUNT, card, parse_count),
        image_url: first_match(&selectors::IMAGE, card).map(|src| absolutize(base_url, &src)),
        product_url: link,
        brand: first_match(&selectors::BRAND, card),
        fetched_at,
        source_id,
    })
}

/// Reads the identifier from the card's own `data-asin`, falling back to
/// nested attributes and then to the product link path.
fn card_source_id(card: ElementRef<'_>) -> Option<String> {
    if let Some(asin) = card
        .value()
        .attr("data-asin")
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return Some(asin.to_string());
    }
    let value = first_match(&selectors::SOURCE_ID, card)?;
    if value.contains('/') {
        source_id_from_href(&value)
    } else {
        Some(value)
    }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
