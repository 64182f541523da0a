//! Ranking score for a category cohort.
//!
//! The score combines a Bayesian-smoothed review score with a min-max
//! normalized price score, both on the 0–5 scale:
//!
//! ```text
//! adjusted = (n * r + C * m) / (n + C)
//! price    = (max - p) / (max - min) * 5      (2.5 when max == min)
//! score    = clamp(adjusted * w_review + price * w_price, 0, 5)
//! ```
//!
//! Weights are taken as configured; the engine does not require them to sum
//! to 1. Listings without a unit price follow the configured
//! [`MissingPricePolicy`].

use tanka_core::{MissingPricePolicy, PricedListing, ScoredListing, ScoringConfig};

use crate::unit_price::cmp_unit_price;

const MAX_SCORE: f64 = 5.0;
const NEUTRAL_PRICE_SCORE: f64 = 2.5;

/// Bayesian-smoothed review score.
///
/// Falls back to the prior mean `m` when the count or average is unknown,
/// so a listing with no reviews is neither rewarded nor penalized.
#[must_use]
pub fn adjusted_review(
    rating_avg: Option<f64>,
    rating_count: Option<u32>,
    config: &ScoringConfig,
) -> f64 {
    let prior = config.prior_mean;
    let (Some(avg), Some(count)) = (rating_avg.filter(|r| r.is_finite()), rating_count) else {
        return prior.clamp(0.0, MAX_SCORE);
    };
    let n = f64::from(count);
    let c = config.confidence_count;
    let denominator = n + c;
    if denominator <= 0.0 {
        return prior.clamp(0.0, MAX_SCORE);
    }
    ((n * avg + c * prior) / denominator).clamp(0.0, MAX_SCORE)
}

/// Range of the non-null unit prices in a cohort.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBounds {
    pub min: f64,
    pub max: f64,
}

/// Returns `None` when no cohort member has a unit price.
#[must_use]
pub fn price_bounds(cohort: &[PricedListing]) -> Option<PriceBounds> {
    cohort
        .iter()
        .filter_map(|l| l.unit_price)
        .filter(|p| p.is_finite())
        .fold(None, |bounds, p| {
            Some(match bounds {
                None => PriceBounds { min: p, max: p },
                Some(PriceBounds { min, max }) => PriceBounds {
                    min: min.min(p),
                    max: max.max(p),
                },
            })
        })
}

/// Min-max price score in `[0, 5]`; cheaper is higher.
///
/// Every member gets 2.5 when all cohort prices are equal. `None` when the
/// listing has no unit price.
#[must_use]
pub fn price_score(unit_price: Option<f64>, bounds: Option<PriceBounds>) -> Option<f64> {
    let price = unit_price?;
    let PriceBounds { min, max } = bounds?;
    let spread = max - min;
    if spread.abs() < f64::EPSILON {
        return Some(NEUTRAL_PRICE_SCORE);
    }
    Some(((max - price) / spread * MAX_SCORE).clamp(0.0, MAX_SCORE))
}

/// Score of `listing` against `cohort`.
///
/// `cohort` is the full set of priced listings in the same category run and
/// defines the price normalization bounds.
#[must_use]
pub fn score(listing: &PricedListing, cohort: &[PricedListing], config: &ScoringConfig) -> f64 {
    score_with_bounds(listing, price_bounds(cohort), config).score
}

/// Scores every member of `cohort` against the cohort's own bounds.
#[must_use]
pub fn score_cohort(cohort: Vec<PricedListing>, config: &ScoringConfig) -> Vec<ScoredListing> {
    let bounds = price_bounds(&cohort);
    cohort
        .into_iter()
        .map(|priced| {
            let parts = score_with_bounds(&priced, bounds, config);
            ScoredListing {
                priced,
                adjusted_review: parts.adjusted_review,
                price_score: parts.price_score,
                score: parts.score,
            }
        })
        .collect()
}

/// Sorts listings with a unit price ahead of those without, then by score
/// descending, then unit price ascending, then `source_id`.
///
/// A listing without a unit price is not comparable on value, so its score
/// (see [`MissingPricePolicy`]) only orders it among other unpriced listings.
#[must_use]
pub fn rank(mut scored: Vec<ScoredListing>) -> Vec<ScoredListing> {
    scored.sort_by(|a, b| {
        a.priced
            .unit_price
            .is_none()
            .cmp(&b.priced.unit_price.is_none())
            .then_with(|| b.score.total_cmp(&a.score))
            .then_with(|| cmp_unit_price(a.priced.unit_price, b.priced.unit_price))
            .then_with(|| a.source_id().cmp(b.source_id()))
    });
    scored
}

struct ScoreParts {
    adjusted_review: f64,
    price_score: Option<f64>,
    score: f64,
}

fn score_with_bounds(
    listing: &PricedListing,
    bounds: Option<PriceBounds>,
    config: &ScoringConfig,
) -> ScoreParts {
    let adjusted = adjusted_review(
        listing.listing.rating_avg,
        listing.listing.rating_count,
        config,
    );
    let price = price_score(listing.unit_price, bounds);
    let raw = match (price, config.missing_price) {
        (Some(p), _) => adjusted * config.review_weight + p * config.price_weight,
        (None, MissingPricePolicy::ReviewOnly) => adjusted,
        (None, MissingPricePolicy::ZeroContribution) => adjusted * config.review_weight,
    };
    ScoreParts {
        adjusted_review: adjusted,
        price_score: price,
        score: clamp_score(raw),
    }
}

fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, MAX_SCORE)
}

#[cfg(test)]
#[path = "score_test.rs"]
mod tests;
