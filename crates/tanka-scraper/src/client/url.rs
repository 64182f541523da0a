//! URL construction for marketplace search pages.

use reqwest::Url;

use crate::error::ScraperError;

/// Validates `base_url` and reduces it to its scheme+host origin.
///
/// Given `"https://www.amazon.co.jp/gp/bestsellers"`, returns
/// `"https://www.amazon.co.jp"`, so search paths always hang off the root.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidBaseUrl`] if the URL does not parse or is
/// not `http`/`https`.
pub fn marketplace_origin(base_url: &str) -> Result<String, ScraperError> {
    let url = Url::parse(base_url).map_err(|e| ScraperError::InvalidBaseUrl {
        base_url: base_url.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ScraperError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason: "expected an http(s) URL with a host".to_string(),
        });
    }
    Ok(url.origin().ascii_serialization())
}

/// Builds the search results URL for `keyword` on 1-based `page`.
///
/// Page 1 omits the `page` parameter, matching the marketplace's own links.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidBaseUrl`] if `origin` does not parse.
pub fn search_url(origin: &str, keyword: &str, page: u32) -> Result<String, ScraperError> {
    let mut url = Url::parse(&format!("{}/s", origin.trim_end_matches('/'))).map_err(|e| {
        ScraperError::InvalidBaseUrl {
            base_url: origin.to_string(),
            reason: e.to_string(),
        }
    })?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("k", keyword);
        if page > 1 {
            query.append_pair("page", &page.to_string());
        }
    }
    Ok(url.to_string())
}

/// Canonical product page for `source_id`.
#[must_use]
pub fn product_url(origin: &str, source_id: &str) -> String {
    format!("{}/dp/{source_id}", origin.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_strips_path() {
        assert_eq!(
            marketplace_origin("https://www.amazon.co.jp/gp/bestsellers").unwrap(),
            "https://www.amazon.co.jp"
        );
    }

    #[test]
    fn origin_keeps_port() {
        assert_eq!(
            marketplace_origin("http://127.0.0.1:8080/").unwrap(),
            "http://127.0.0.1:8080"
        );
    }

    #[test]
    fn origin_rejects_garbage() {
        assert!(matches!(
            marketplace_origin("not a url"),
            Err(ScraperError::InvalidBaseUrl { .. })
        ));
        assert!(marketplace_origin("ftp://example.com").is_err());
    }

    #[test]
    fn search_url_encodes_keyword() {
        let url = search_url("https://www.amazon.co.jp", "トイレットペーパー ダブル", 1).unwrap();
        assert!(url.starts_with("https://www.amazon.co.jp/s?k="));
        assert!(!url.contains("page="));
        assert!(!url.contains(' '));
    }

    #[test]
    fn search_url_adds_page_after_first() {
        let url = search_url("https://www.amazon.co.jp", "rice", 3).unwrap();
        assert_eq!(url, "https://www.amazon.co.jp/s?k=rice&page=3");
    }

    #[test]
    fn product_url_joins_id() {
        assert_eq!(
            product_url("https://www.amazon.co.jp/", "B0C1234567"),
            "https://www.amazon.co.jp/dp/B0C1234567"
        );
    }
}
