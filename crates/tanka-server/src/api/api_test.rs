use std::collections::HashMap;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use tanka_core::InboundLimit;
use tanka_extract::AttributeExtractor;
use tanka_scraper::{MarketplaceScraper, OutboundGate, OutboundGateConfig, ScraperConfig};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

const CATEGORIES: &str = r"
categories:
  - slug: toilet-paper
    name: トイレットペーパー
    keyword: トイレットペーパー
    measure: length
";

fn state(base_url: &str, hourly_cap: usize) -> AppState {
    let outbound = Arc::new(OutboundGate::new(OutboundGateConfig {
        min_interval_ms: 0,
        max_interval_ms: 0,
        hourly_cap,
    }));
    let scraper = MarketplaceScraper::new(
        &ScraperConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            user_agent: "tanka-test/0.1".to_string(),
            max_pages: 1,
        },
        outbound,
    )
    .expect("scraper");
    let categories =
        tanka_core::categories::parse_categories(CATEGORIES).expect("categories yaml");
    AppState {
        pipeline: Arc::new(Pipeline::new(
            scraper,
            AttributeExtractor::new(),
            categories.scoring,
        )),
        categories: Arc::new(categories),
        store: ListingStore::new(),
    }
}

fn limit(max_requests: usize) -> InboundLimit {
    InboundLimit {
        max_requests,
        window: Duration::from_secs(60),
    }
}

fn open_gate() -> InboundGate {
    InboundGate::new(HashMap::from([
        (OperationClass::Read, limit(1000)),
        (OperationClass::RefetchItem, limit(1000)),
        (OperationClass::FullRescrape, limit(1000)),
    ]))
}

fn card(asin: &str, title: &str, price: &str) -> String {
    format!(
        r#"<div data-component-type="s-search-result" data-asin="{asin}">
             <h2><a href="/dp/{asin}"><span>{title}</span></a></h2>
             <span class="a-price"><span class="a-offscreen">{price}</span></span>
           </div>"#
    )
}

fn results_html(cards: &[String]) -> String {
    format!(
        r#"<html><body><div class="s-main-slot s-result-list">{}</div></body></html>"#,
        cards.join("")
    )
}

async fn mount_search(server: &MockServer, keyword: &str, cards: &[String]) {
    Mock::given(method("GET"))
        .and(path("/s"))
        .and(query_param("k", keyword))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(results_html(cards), "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

async fn send(app: &Router, method: &str, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("x-forwarded-for", "203.0.113.7")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response")
}

async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

// ---------------------------------------------------------------------------
// Envelope and helpers
// ---------------------------------------------------------------------------

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None), 50);
    assert_eq!(normalize_limit(Some(0)), 1);
    assert_eq!(normalize_limit(Some(1_000)), 200);
    assert_eq!(normalize_limit(Some(25)), 25);
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("not_found", StatusCode::NOT_FOUND),
        ("quota_exceeded", StatusCode::SERVICE_UNAVAILABLE),
        ("upstream_error", StatusCode::BAD_GATEWAY),
        ("anything_else", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), status, "{code}");
    }
}

#[tokio::test]
async fn health_returns_envelope_with_request_id() {
    let server = MockServer::start().await;
    let app = build_app(state(&server.uri(), 100), &open_gate());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-abc")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-abc");
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["categories"], 1);
    assert_eq!(json["meta"]["request_id"], "req-abc");
    assert!(json["meta"]["timestamp"].is_string());
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_category_is_not_found() {
    let server = MockServer::start().await;
    let app = build_app(state(&server.uri(), 100), &open_gate());

    let response = send(&app, "GET", "/api/v1/categories/shampoo/listings").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn listings_are_empty_before_first_scrape() {
    let server = MockServer::start().await;
    let app = build_app(state(&server.uri(), 100), &open_gate());

    let response = send(&app, "GET", "/api/v1/categories/toilet-paper/listings").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-ratelimit-remaining"));
    let json = json_body(response).await;
    assert_eq!(json["data"]["total"], 0);
    assert_eq!(json["data"]["unit"], "m");
    assert!(json["data"]["updated_at"].is_null());
}

#[tokio::test]
async fn rescrape_stores_ranked_listings() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        "トイレットペーパー",
        &[
            card("B0C0000001", "エリエール 12ロール×4パック ダブル 25m", "￥3,000"),
            card("B0C0000002", "スコッティ 12ロール シングル 50m", "￥1,200"),
        ],
    )
    .await;
    let app = build_app(state(&server.uri(), 100), &open_gate());

    let response = send(&app, "POST", "/api/v1/categories/toilet-paper/rescrape").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["scraped"], 2);
    assert_eq!(json["data"]["stored"], 2);

    let response = send(&app, "GET", "/api/v1/categories/toilet-paper/listings?limit=1").await;
    let json = json_body(response).await;
    assert_eq!(json["data"]["total"], 2);
    let listings = json["data"]["listings"].as_array().expect("listings");
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["source_id"], "B0C0000002");
    assert_eq!(listings[0]["unit_price"], 2.0);
    assert_eq!(listings[0]["attributes"]["total_length_m"], 600.0);
}

#[tokio::test]
async fn refetch_replaces_listing_and_rescores() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        "トイレットペーパー",
        &[
            card("B0C0000001", "エリエール 12ロール×4パック ダブル 25m", "￥3,000"),
            card("B0C0000002", "スコッティ 12ロール シングル 50m", "￥1,200"),
        ],
    )
    .await;
    // Price drop on the Elleair pack: 1,800 / 1,200m = 1.5 per metre.
    mount_search(
        &server,
        "B0C0000001",
        &[card("B0C0000001", "エリエール 12ロール×4パック ダブル 25m", "￥1,800")],
    )
    .await;
    let app = build_app(state(&server.uri(), 100), &open_gate());

    send(&app, "POST", "/api/v1/categories/toilet-paper/rescrape").await;
    let response = send(
        &app,
        "POST",
        "/api/v1/categories/toilet-paper/listings/B0C0000001/refetch",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["source_id"], "B0C0000001");
    assert_eq!(json["data"]["unit_price"], 1.5);
    assert_eq!(json["data"]["price_score"], 5.0);

    let response = send(&app, "GET", "/api/v1/categories/toilet-paper/listings").await;
    let json = json_body(response).await;
    assert_eq!(json["data"]["total"], 2);
    assert_eq!(json["data"]["listings"][0]["source_id"], "B0C0000001");
}

#[tokio::test]
async fn refetch_rejects_malformed_source_id() {
    let server = MockServer::start().await;
    let app = build_app(state(&server.uri(), 100), &open_gate());

    let response = send(
        &app,
        "POST",
        "/api/v1/categories/toilet-paper/listings/bad-id!/refetch",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refetch_of_missing_listing_is_not_found() {
    let server = MockServer::start().await;
    mount_search(&server, "B0C9999999", &[]).await;
    let app = build_app(state(&server.uri(), 100), &open_gate());

    let response = send(
        &app,
        "POST",
        "/api/v1/categories/toilet-paper/listings/B0C9999999/refetch",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn exhausted_outbound_quota_is_service_unavailable() {
    let server = MockServer::start().await;
    let app = build_app(state(&server.uri(), 0), &open_gate());

    let response = send(&app, "POST", "/api/v1/categories/toilet-paper/rescrape").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "quota_exceeded");
}

#[tokio::test]
async fn unreachable_marketplace_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let app = build_app(state(&server.uri(), 100), &open_gate());

    let response = send(&app, "POST", "/api/v1/categories/toilet-paper/rescrape").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

// ---------------------------------------------------------------------------
// Inbound gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sixth_refetch_in_window_is_rate_limited() {
    let server = MockServer::start().await;
    mount_search(&server, "B0C9999999", &[]).await;
    let gate = InboundGate::new(HashMap::from([
        (OperationClass::Read, limit(1000)),
        (OperationClass::RefetchItem, limit(5)),
    ]));
    let app = build_app(state(&server.uri(), 100), &gate);
    let uri = "/api/v1/categories/toilet-paper/listings/B0C9999999/refetch";

    for remaining in (0..5).rev() {
        let response = send(&app, "POST", uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            remaining.to_string().as_str()
        );
    }

    let response = send(&app, "POST", uri).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    let retry_after: u64 = response.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "rate_limited");

    // Reads have their own budget.
    let response = send(&app, "GET", "/api/v1/categories/toilet-paper/listings").await;
    assert_eq!(response.status(), StatusCode::OK);
}
