//! Internal value parsers for text scraped from search result cards.
//!
//! Every parser returns `None` on input it cannot interpret; a missing value
//! is never an error at this layer.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

/// Minimum length of a marketplace item identifier.
pub(crate) const MIN_SOURCE_ID_LEN: usize = 10;

static DP_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:dp|gp/product)/([A-Za-z0-9]{10})").expect("valid dp regex"));

/// Japanese rating text, e.g. `"5つ星のうち4.3"`.
static RATING_JA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"うち\s*([0-9]+(?:\.[0-9]+)?)").expect("valid ja rating regex"));

/// English rating text, e.g. `"4.3 out of 5 stars"`.
static RATING_EN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*out of").expect("valid en rating regex")
});

/// Keeps only ASCII digits.
///
/// `"￥1,280"` → `"1280"`, `"(2,345)"` → `"2345"`.
pub(crate) fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Parses a whole-unit price by stripping everything but digits.
///
/// Prices with a fractional part (`"$12.99"`) would lose their decimal point,
/// so anything after the first `.` is ignored before stripping.
pub(crate) fn parse_price(s: &str) -> Option<Decimal> {
    let whole = s.split('.').next().unwrap_or(s);
    let digits = digits_only(whole);
    if digits.is_empty() {
        return None;
    }
    digits.parse::<Decimal>().ok()
}

/// Parses a review count such as `"2,345"` or `"(1,024)"`.
pub(crate) fn parse_count(s: &str) -> Option<u32> {
    let digits = digits_only(s);
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u32>().ok()
}

/// Parses a star rating in either the Japanese or the English form.
///
/// Returns `None` for values outside `[0, 5]`.
pub(crate) fn parse_rating(s: &str) -> Option<f64> {
    let caps = RATING_JA.captures(s).or_else(|| RATING_EN.captures(s))?;
    let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
    (0.0..=5.0).contains(&value).then_some(value)
}

/// Pulls the 10-character item identifier out of a product link.
pub(crate) fn source_id_from_href(href: &str) -> Option<String> {
    DP_PATH
        .captures(href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Returns `true` if `id` looks like a marketplace item identifier.
pub(crate) fn is_valid_source_id(id: &str) -> bool {
    id.len() >= MIN_SOURCE_ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Resolves a possibly relative `href` against `base_url`.
pub(crate) fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{rest}");
    }
    let base = base_url.trim_end_matches('/');
    if href.starts_with('/') {
        format!("{base}{href}")
    } else {
        format!("{base}/{href}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_only_strips_currency_and_separators() {
        assert_eq!(digits_only("￥1,280"), "1280");
        assert_eq!(digits_only("(2,345)"), "2345");
        assert_eq!(digits_only("なし"), "");
    }

    #[test]
    fn parse_price_yen() {
        assert_eq!(parse_price("￥1,280"), Some(Decimal::new(1280, 0)));
    }

    #[test]
    fn parse_price_drops_fraction() {
        assert_eq!(parse_price("$12.99"), Some(Decimal::new(12, 0)));
    }

    #[test]
    fn parse_price_without_digits_is_none() {
        assert!(parse_price("価格なし").is_none());
    }

    #[test]
    fn parse_count_handles_parentheses() {
        assert_eq!(parse_count("(1,024)"), Some(1024));
        assert!(parse_count("").is_none());
    }

    #[test]
    fn parse_rating_japanese() {
        assert_eq!(parse_rating("5つ星のうち4.3"), Some(4.3));
    }

    #[test]
    fn parse_rating_english() {
        assert_eq!(parse_rating("4.5 out of 5 stars"), Some(4.5));
    }

    #[test]
    fn parse_rating_out_of_range_is_none() {
        assert!(parse_rating("5つ星のうち7.0").is_none());
        assert!(parse_rating("no stars").is_none());
    }

    #[test]
    fn source_id_from_dp_link() {
        assert_eq!(
            source_id_from_href("/エリエール/dp/B0C1234567/ref=sr_1_1?keywords=x").as_deref(),
            Some("B0C1234567")
        );
        assert!(source_id_from_href("/s?k=rice").is_none());
    }

    #[test]
    fn source_id_validation() {
        assert!(is_valid_source_id("B0C1234567"));
        assert!(!is_valid_source_id("B0C123"));
        assert!(!is_valid_source_id("B0C12345-7"));
        assert!(!is_valid_source_id(""));
    }

    #[test]
    fn absolutize_relative_and_absolute() {
        assert_eq!(
            absolutize("https://www.amazon.co.jp/", "/dp/B0C1234567"),
            "https://www.amazon.co.jp/dp/B0C1234567"
        );
        assert_eq!(
            absolutize("https://www.amazon.co.jp", "https://m.media-amazon.com/i.jpg"),
            "https://m.media-amazon.com/i.jpg"
        );
        assert_eq!(
            absolutize("https://www.amazon.co.jp", "//m.media-amazon.com/i.jpg"),
            "https://m.media-amazon.com/i.jpg"
        );
    }
}
