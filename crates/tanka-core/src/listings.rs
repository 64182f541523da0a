use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::categories::Measure;

/// One search-result entry scraped from the marketplace.
///
/// Created once per scrape cycle and never mutated afterwards; the next
/// cycle for the same `source_id` produces a fresh record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    /// Marketplace item identifier (an ASIN on Amazon), unique per marketplace.
    pub source_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Current price in the marketplace currency (JPY has no minor digits).
    pub price: Option<Decimal>,
    /// Pre-discount price shown struck through, if any.
    pub regular_price: Option<Decimal>,
    /// Average star rating in `[0.0, 5.0]`.
    pub rating_avg: Option<f64>,
    pub rating_count: Option<u32>,
    pub image_url: Option<String>,
    /// Canonical product page, e.g. `"https://www.amazon.co.jp/dp/B0C1234567"`.
    pub product_url: Option<String>,
    pub brand: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Physical attributes parsed from a listing's title and description.
///
/// Every field is independently nullable: extraction is best-effort and a
/// missing field never blocks downstream processing of the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedAttributes {
    /// Units per pack, e.g. `12` in `"12ロール×4パック"` or `3` in `"400ml×3個"`.
    pub unit_count: Option<u32>,
    /// Pack multiplier, e.g. `4` in `"12ロール×4パック"`.
    pub pack_multiplier: Option<u32>,
    /// `unit_count * pack_multiplier`, or whichever of the two was found.
    pub total_count: Option<u32>,
    /// Length of one roll in metres.
    pub unit_length_m: Option<f64>,
    pub total_length_m: Option<f64>,
    /// Volume of one unit in millilitres.
    pub volume_ml: Option<f64>,
    pub total_volume_ml: Option<f64>,
    /// Weight of one unit in kilograms.
    pub weight_kg: Option<f64>,
    pub total_weight_kg: Option<f64>,
    /// `Some(true)` for double ply, `Some(false)` for single ply.
    pub ply_is_double: Option<bool>,
    /// `Some(true)` for refill packs, `Some(false)` for the main bottle.
    pub is_refill: Option<bool>,
}

impl ExtractedAttributes {
    /// Recomputes every derived total from the per-unit fields.
    ///
    /// `total_count` is the product of `unit_count` and `pack_multiplier`
    /// when both are known, otherwise whichever one is known. Measure totals
    /// multiply the per-unit measure by `total_count`; with no count the
    /// per-unit measure is taken as the total.
    pub fn derive_totals(&mut self) {
        self.total_count = match (self.unit_count, self.pack_multiplier) {
            (Some(count), Some(mult)) => count.checked_mul(mult),
            (Some(count), None) => Some(count),
            (None, Some(mult)) => Some(mult),
            (None, None) => None,
        };

        let count = self.total_count.map(f64::from);
        let scale = |per_unit: Option<f64>| per_unit.map(|v| count.map_or(v, |c| v * c));

        self.total_length_m = scale(self.unit_length_m);
        self.total_volume_ml = scale(self.volume_ml);
        self.total_weight_kg = scale(self.weight_kg);
    }

    /// Fills every field that is still `None` from `other`, leaving known
    /// fields untouched, then re-derives totals.
    pub fn fill_missing_from(&mut self, other: &ExtractedAttributes) {
        self.unit_count = self.unit_count.or(other.unit_count);
        self.pack_multiplier = self.pack_multiplier.or(other.pack_multiplier);
        self.unit_length_m = self.unit_length_m.or(other.unit_length_m);
        self.volume_ml = self.volume_ml.or(other.volume_ml);
        self.weight_kg = self.weight_kg.or(other.weight_kg);
        self.ply_is_double = self.ply_is_double.or(other.ply_is_double);
        self.is_refill = self.is_refill.or(other.is_refill);
        self.derive_totals();
    }

    /// Returns the total quantity used as the unit-price divisor for `measure`.
    #[must_use]
    pub fn total_for(&self, measure: Measure) -> Option<f64> {
        match measure {
            Measure::Length => self.total_length_m,
            Measure::Volume => self.total_volume_ml,
            Measure::Weight => self.total_weight_kg,
            Measure::Count => self.total_count.map(f64::from),
        }
    }
}

/// A [`RawListing`] with its extracted attributes and derived prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedListing {
    #[serde(flatten)]
    pub listing: RawListing,
    pub attributes: ExtractedAttributes,
    /// Price per category measure (per metre, litre, kilogram or item).
    /// `None` means "incomparable" and sorts last.
    pub unit_price: Option<f64>,
    /// Whole-percent discount, present only when `regular_price > price`.
    pub discount_percent: Option<u32>,
}

/// A [`PricedListing`] with its ranking score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredListing {
    #[serde(flatten)]
    pub priced: PricedListing,
    /// Bayesian-smoothed review score in `[0, 5]`.
    pub adjusted_review: f64,
    /// Min-max normalized price score in `[0, 5]`; `None` without a unit price.
    pub price_score: Option<f64>,
    /// Final weighted score in `[0, 5]`. Always defined.
    pub score: f64,
}

impl ScoredListing {
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.priced.listing.source_id
    }
}

/// The ranked output of one category run, handed to storage as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRun {
    pub category: String,
    pub keyword: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub listings: Vec<ScoredListing>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_count_is_product_of_count_and_multiplier() {
        let mut attrs = ExtractedAttributes {
            unit_count: Some(12),
            pack_multiplier: Some(4),
            ..ExtractedAttributes::default()
        };
        attrs.derive_totals();
        assert_eq!(attrs.total_count, Some(48));
    }

    #[test]
    fn total_count_uses_single_found_value() {
        let mut attrs = ExtractedAttributes {
            pack_multiplier: Some(6),
            ..ExtractedAttributes::default()
        };
        attrs.derive_totals();
        assert_eq!(attrs.total_count, Some(6));
    }

    #[test]
    fn total_length_scales_by_total_count() {
        let mut attrs = ExtractedAttributes {
            unit_count: Some(12),
            pack_multiplier: Some(4),
            unit_length_m: Some(25.0),
            ..ExtractedAttributes::default()
        };
        attrs.derive_totals();
        assert_eq!(attrs.total_length_m, Some(1200.0));
    }

    #[test]
    fn measure_without_count_is_its_own_total() {
        let mut attrs = ExtractedAttributes {
            weight_kg: Some(5.0),
            ..ExtractedAttributes::default()
        };
        attrs.derive_totals();
        assert_eq!(attrs.total_weight_kg, Some(5.0));
        assert!(attrs.total_count.is_none());
    }

    #[test]
    fn fill_missing_keeps_known_fields() {
        let mut attrs = ExtractedAttributes {
            unit_count: Some(12),
            ply_is_double: Some(false),
            ..ExtractedAttributes::default()
        };
        let other = ExtractedAttributes {
            unit_count: Some(99),
            unit_length_m: Some(50.0),
            ply_is_double: Some(true),
            ..ExtractedAttributes::default()
        };
        attrs.fill_missing_from(&other);
        assert_eq!(attrs.unit_count, Some(12));
        assert_eq!(attrs.ply_is_double, Some(false));
        assert_eq!(attrs.unit_length_m, Some(50.0));
        assert_eq!(attrs.total_length_m, Some(600.0));
    }

    #[test]
    fn total_for_count_measure() {
        let mut attrs = ExtractedAttributes {
            unit_count: Some(24),
            ..ExtractedAttributes::default()
        };
        attrs.derive_totals();
        assert_eq!(attrs.total_for(Measure::Count), Some(24.0));
        assert!(attrs.total_for(Measure::Length).is_none());
    }

    #[test]
    fn priced_listing_serializes_flat() {
        let priced = PricedListing {
            listing: RawListing {
                source_id: "B0C1234567".to_string(),
                title: "test".to_string(),
                description: None,
                price: Some(Decimal::new(1280, 0)),
                regular_price: None,
                rating_avg: None,
                rating_count: None,
                image_url: None,
                product_url: None,
                brand: None,
                fetched_at: Utc::now(),
            },
            attributes: ExtractedAttributes::default(),
            unit_price: None,
            discount_percent: None,
        };
        let json = serde_json::to_value(&priced).expect("serialize");
        assert_eq!(json["source_id"], "B0C1234567");
        assert_eq!(json["price"], "1280");
        assert!(json["unit_price"].is_null());
    }
}
