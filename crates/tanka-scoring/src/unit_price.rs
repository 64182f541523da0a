use std::cmp::Ordering;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tanka_core::{ExtractedAttributes, Measure, PricedListing, RawListing};

/// Price per category measure: per metre, litre, kilogram or item.
///
/// Returns `None` when the price or the divisor attribute is unknown, when
/// the divisor is not positive, or when the result is not finite. Results
/// are rounded to two decimals.
#[must_use]
pub fn normalize(
    price: Option<Decimal>,
    attributes: &ExtractedAttributes,
    measure: Measure,
) -> Option<f64> {
    let price = price?.to_f64()?;
    let divisor = match measure {
        Measure::Volume => attributes.total_volume_ml.map(|ml| ml / 1000.0),
        Measure::Length | Measure::Weight | Measure::Count => attributes.total_for(measure),
    }?;
    if divisor.is_nan() || divisor <= 0.0 {
        return None;
    }
    let unit_price = price / divisor;
    unit_price
        .is_finite()
        .then(|| (unit_price * 100.0).round() / 100.0)
}

/// Whole-percent discount of `price` against `regular_price`.
///
/// Present only when both are known and `regular_price` strictly exceeds
/// `price`; never negative. Halves round away from zero.
#[must_use]
pub fn discount_percent(price: Option<Decimal>, regular_price: Option<Decimal>) -> Option<u32> {
    let (price, regular) = (price?, regular_price?);
    if price.is_sign_negative() || regular <= price {
        return None;
    }
    let percent = ((regular - price) / regular * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    percent.to_u32()
}

/// Attaches attributes and derived prices to a raw listing.
#[must_use]
pub fn price_listing(
    listing: RawListing,
    attributes: ExtractedAttributes,
    measure: Measure,
) -> PricedListing {
    let unit_price = normalize(listing.price, &attributes, measure);
    let discount_percent = discount_percent(listing.price, listing.regular_price);
    PricedListing {
        listing,
        attributes,
        unit_price,
        discount_percent,
    }
}

/// Orders unit prices ascending with `None` last.
#[must_use]
pub fn cmp_unit_price(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
