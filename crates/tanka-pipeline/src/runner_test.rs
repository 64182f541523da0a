use chrono::Utc;
use tanka_core::{ExtractedAttributes, RawListing};

use super::*;

fn scored(id: &str, unit_price: Option<f64>) -> ScoredListing {
    ScoredListing {
        priced: priced(id, unit_price),
        adjusted_review: 3.5,
        price_score: None,
        score: 3.5,
    }
}

fn priced(id: &str, unit_price: Option<f64>) -> PricedListing {
    PricedListing {
        listing: RawListing {
            source_id: id.to_string(),
            title: format!("item {id}"),
            description: None,
            price: None,
            regular_price: None,
            rating_avg: None,
            rating_count: None,
            image_url: None,
            product_url: None,
            brand: None,
            fetched_at: Utc::now(),
        },
        attributes: ExtractedAttributes::default(),
        unit_price,
        discount_percent: None,
    }
}

#[test]
fn replace_listing_swaps_matching_member() {
    let cohort = vec![scored("B0C0000001", Some(1.0)), scored("B0C0000002", Some(2.0))];
    let merged = replace_listing(cohort, priced("B0C0000002", Some(9.0)));

    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].unit_price, Some(1.0));
    assert_eq!(merged[1].listing.source_id, "B0C0000002");
    assert_eq!(merged[1].unit_price, Some(9.0));
}

#[test]
fn replace_listing_appends_unknown_id() {
    let cohort = vec![scored("B0C0000001", Some(1.0))];
    let merged = replace_listing(cohort, priced("B0C0000003", None));

    let ids: Vec<_> = merged.iter().map(|p| p.listing.source_id.as_str()).collect();
    assert_eq!(ids, vec!["B0C0000001", "B0C0000003"]);
}

#[test]
fn replace_listing_into_empty_cohort() {
    let merged = replace_listing(Vec::new(), priced("B0C0000001", Some(4.0)));
    assert_eq!(merged.len(), 1);
}
