use chrono::TimeZone;
use rust_decimal::Decimal;

use super::*;

const BASE: &str = "https://www.amazon.co.jp";

fn fetched_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap()
}

fn card(asin: &str, title: &str) -> String {
    format!(
        r#"<div data-component-type="s-search-result" data-asin="{asin}">
             <h2><a class="a-link-normal" href="/dp/{asin}/ref=sr_1_1"><span>{title}</span></a></h2>
             <span class="a-price"><span class="a-offscreen">￥1,280</span></span>
             <span class="a-price" data-a-strike="true"><span class="a-offscreen">￥1,580</span></span>
             <i><span class="a-icon-alt">5つ星のうち4.3</span></i>
             <a href="/dp/{asin}#customerReviews"><span class="a-size-base s-underline-text">2,345</span></a>
             <img class="s-image" src="https://m.media-amazon.com/images/I/{asin}.jpg" alt="{title}">
           </div>"#
    )
}

fn page(cards: &[String], next: bool) -> String {
    let next_link = if next {
        r#"<a class="s-pagination-item s-pagination-next" href="/s?k=x&page=2">次へ</a>"#
    } else {
        r#"<span class="s-pagination-item s-pagination-next s-pagination-disabled">次へ</span>"#
    };
    format!(
        r#"<html><body><div class="s-main-slot s-result-list">{}</div>{next_link}</body></html>"#,
        cards.join("\n")
    )
}

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

#[test]
fn parses_full_card() {
    let html = page(
        &[card("B0C1234567", "エリエール トイレットペーパー 12ロール×4パック ダブル 25m")],
        false,
    );
    let result = parse_search_page(&html, BASE, fetched_at()).unwrap();

    assert_eq!(result.listings.len(), 1);
    let listing = &result.listings[0];
    assert_eq!(listing.source_id, "B0C1234567");
    assert_eq!(
        listing.title,
        "エリエール トイレットペーパー 12ロール×4パック ダブル 25m"
    );
    assert_eq!(listing.price, Some(Decimal::new(1280, 0)));
    assert_eq!(listing.regular_price, Some(Decimal::new(1580, 0)));
    assert_eq!(listing.rating_avg, Some(4.3));
    assert_eq!(listing.rating_count, Some(2345));
    assert_eq!(
        listing.product_url.as_deref(),
        Some("https://www.amazon.co.jp/dp/B0C1234567/ref=sr_1_1")
    );
    assert_eq!(
        listing.image_url.as_deref(),
        Some("https://m.media-amazon.com/images/I/B0C1234567.jpg")
    );
    assert_eq!(listing.fetched_at, fetched_at());
}

#[test]
fn missing_optional_fields_are_none() {
    let html = page(
        &[r#"<div data-component-type="s-search-result" data-asin="B0C7654321">
               <h2><span class="a-text-normal">お米 5kg</span></h2>
             </div>"#
            .to_string()],
        false,
    );
    let result = parse_search_page(&html, BASE, fetched_at()).unwrap();
    let listing = &result.listings[0];
    assert!(listing.price.is_none());
    assert!(listing.regular_price.is_none());
    assert!(listing.rating_avg.is_none());
    assert!(listing.rating_count.is_none());
    assert!(listing.image_url.is_none());
    assert_eq!(
        listing.product_url.as_deref(),
        Some("https://www.amazon.co.jp/dp/B0C7654321")
    );
}

#[test]
fn source_id_falls_back_to_product_link() {
    let html = page(
        &[r#"<div data-component-type="s-search-result" data-asin="">
               <h2><a href="/some-title/dp/B0CAAAAAAA/ref=x"><span>title</span></a></h2>
             </div>"#
            .to_string()],
        false,
    );
    let result = parse_search_page(&html, BASE, fetched_at()).unwrap();
    assert_eq!(result.listings[0].source_id, "B0CAAAAAAA");
}

// ---------------------------------------------------------------------------
// Card rejection
// ---------------------------------------------------------------------------

#[test]
fn card_without_id_is_skipped() {
    let html = page(
        &[
            r#"<div data-component-type="s-search-result"><h2><span class="a-text-normal">広告</span></h2></div>"#
                .to_string(),
            card("B0C1234567", "valid"),
        ],
        false,
    );
    let result = parse_search_page(&html, BASE, fetched_at()).unwrap();
    assert_eq!(result.listings.len(), 1);
    assert_eq!(result.skipped, 1);
}

#[test]
fn card_with_short_id_is_skipped() {
    let html = page(&[card("B0C123", "short id")], false);
    let result = parse_search_page(&html, BASE, fetched_at()).unwrap();
    assert!(result.listings.is_empty());
    assert_eq!(result.skipped, 1);
}

#[test]
fn card_with_empty_title_is_skipped() {
    let html = page(
        &[r#"<div data-component-type="s-search-result" data-asin="B0C1234567"><h2><a><span> </span></a></h2></div>"#
            .to_string()],
        false,
    );
    let result = parse_search_page(&html, BASE, fetched_at()).unwrap();
    assert!(result.listings.is_empty());
    assert_eq!(result.skipped, 1);
}

#[test]
fn duplicate_ids_keep_first_occurrence() {
    let html = page(
        &[card("B0C1234567", "first"), card("B0C1234567", "second")],
        false,
    );
    let result = parse_search_page(&html, BASE, fetched_at()).unwrap();
    assert_eq!(result.listings.len(), 1);
    assert_eq!(result.listings[0].title, "first");
}

// ---------------------------------------------------------------------------
// Page-level
// ---------------------------------------------------------------------------

#[test]
fn empty_result_page_is_ok() {
    let html = page(&[], false);
    let result = parse_search_page(&html, BASE, fetched_at()).unwrap();
    assert!(result.listings.is_empty());
    assert!(!result.has_next);
    assert_eq!(result.skipped, 0);
}

#[test]
fn detects_next_page_link() {
    let html = page(&[card("B0C1234567", "x")], true);
    assert!(parse_search_page(&html, BASE, fetched_at()).unwrap().has_next);
}

#[test]
fn captcha_page_is_blocked() {
    let html = r#"<html><body>
        <form method="get" action="/errors/validateCaptcha">
          <input id="captchacharacters" name="field-keywords">
        </form></body></html>"#;
    let err = parse_search_page(html, BASE, fetched_at()).unwrap_err();
    assert!(matches!(err, ScraperError::Blocked { .. }));
}
