//! Prioritized extraction strategies for marketplace search pages.
//!
//! Each field has an ordered list of strategies. The first strategy that
//! yields a non-empty value wins; markup drift usually breaks one strategy
//! at a time, so the fallbacks keep the field populated until the list is
//! updated.

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

/// What to read from a matched element.
#[derive(Debug, Clone, Copy)]
pub enum Extract {
    /// Whitespace-collapsed text content.
    Text,
    /// A named attribute.
    Attr(&'static str),
}

#[derive(Debug)]
pub struct Strategy {
    pub selector: Selector,
    pub extract: Extract,
}

impl Strategy {
    fn new(css: &str, extract: Extract) -> Self {
        Self {
            selector: Selector::parse(css).expect("valid strategy selector"),
            extract,
        }
    }

    fn text(css: &str) -> Self {
        Self::new(css, Extract::Text)
    }

    fn attr(css: &str, name: &'static str) -> Self {
        Self::new(css, Extract::Attr(name))
    }

    /// Applies this strategy inside `scope`, returning the first non-empty value.
    #[must_use]
    pub fn apply(&self, scope: ElementRef<'_>) -> Option<String> {
        self.values(scope).next()
    }

    /// Every non-empty value this strategy reads inside `scope`, in document
    /// order.
    pub fn values<'a>(&'a self, scope: ElementRef<'a>) -> impl Iterator<Item = String> + 'a {
        scope.select(&self.selector).filter_map(move |el| {
            let value = match self.extract {
                Extract::Text => collapse_whitespace(&el.text().collect::<String>()),
                Extract::Attr(name) => el.value().attr(name)?.trim().to_string(),
            };
            (!value.is_empty()).then_some(value)
        })
    }
}

/// Runs `strategies` in order and returns the first non-empty value.
#[must_use]
pub fn first_match(strategies: &[Strategy], scope: ElementRef<'_>) -> Option<String> {
    strategies.iter().find_map(|s| s.apply(scope))
}

/// Like [`first_match`], but a value `parse` rejects does not end the
/// search: later elements and later strategies are still tried.
#[must_use]
pub fn first_parsed<T>(
    strategies: &[Strategy],
    scope: ElementRef<'_>,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    strategies
        .iter()
        .flat_map(|s| s.values(scope))
        .find_map(|value| parse(&value))
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Search result card container.
pub static RESULT_CARD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-component-type='s-search-result']").expect("valid card selector")
});

/// Fallbacks for when the card element itself carries no `data-asin`.
pub static SOURCE_ID: LazyLock<Vec<Strategy>> = LazyLock::new(|| {
    vec![
        Strategy::attr("[data-asin]", "data-asin"),
        Strategy::attr("h2 a, a.a-link-normal[href*='/dp/']", "href"),
    ]
});

pub static TITLE: LazyLock<Vec<Strategy>> = LazyLock::new(|| {
    vec![
        Strategy::text("h2 a span"),
        Strategy::text("h2 span.a-text-normal"),
        Strategy::text(".a-size-base-plus.a-text-normal, .a-size-medium.a-text-normal"),
        Strategy::attr("h2", "aria-label"),
        Strategy::attr("img.s-image", "alt"),
    ]
});

pub static PRODUCT_LINK: LazyLock<Vec<Strategy>> = LazyLock::new(|| {
    vec![
        Strategy::attr("h2 a", "href"),
        Strategy::attr("a.a-link-normal.s-no-outline", "href"),
        Strategy::attr("a.a-link-normal[href*='/dp/']", "href"),
    ]
});

/// Current price, skipping the struck-through list price.
pub static PRICE: LazyLock<Vec<Strategy>> = LazyLock::new(|| {
    vec![
        Strategy::text(".a-price:not([data-a-strike='true']) .a-offscreen"),
        Strategy::text(".a-price:not([data-a-strike='true']) .a-price-whole"),
        Strategy::text(".a-color-price"),
    ]
});

/// Struck-through list price.
pub static REGULAR_PRICE: LazyLock<Vec<Strategy>> = LazyLock::new(|| {
    vec![
        Strategy::text(".a-price[data-a-strike='true'] .a-offscreen"),
        Strategy::text(".a-text-price .a-offscreen"),
    ]
});

pub static RATING: LazyLock<Vec<Strategy>> = LazyLock::new(|| {
    vec![
        Strategy::text("span.a-icon-alt"),
        Strategy::attr("[aria-label*='5つ星のうち']", "aria-label"),
        Strategy::attr("[aria-label*='out of 5']", "aria-label"),
    ]
});

pub static RATING_COUNT: LazyLock<Vec<Strategy>> = LazyLock::new(|| {
    vec![
        Strategy::text("a[href*='customerReviews'] span.s-underline-text"),
        Strategy::text("span.a-size-base.s-underline-text"),
        Strategy::attr("a[href*='customerReviews']", "aria-label"),
    ]
});

pub static IMAGE: LazyLock<Vec<Strategy>> = LazyLock::new(|| {
    vec![
        Strategy::attr("img.s-image", "src"),
        Strategy::attr("img.s-image", "data-src"),
        Strategy::attr(".s-product-image-container img", "src"),
    ]
});

pub static BRAND: LazyLock<Vec<Strategy>> = LazyLock::new(|| {
    vec![
        Strategy::text("h2 + div .a-size-base-plus.a-color-base"),
        Strategy::text(".s-line-clamp-1 .a-size-base-plus.a-color-base"),
        Strategy::text("span.a-size-base-plus.a-color-base:not(.a-text-normal)"),
    ]
});

pub static NEXT_PAGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a.s-pagination-next:not(.s-pagination-disabled)")
        .expect("valid pagination selector")
});

/// Markers of the marketplace's bot-check interstitial.
pub static CAPTCHA: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("form[action*='validateCaptcha'], #captchacharacters")
        .expect("valid captcha selector")
});
