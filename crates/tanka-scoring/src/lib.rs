//! Unit-price normalization and ranking for one category cohort.
//!
//! Everything here is a pure function over in-memory records: no I/O, no
//! shared state, and `None` flows through as "incomparable" rather than
//! being replaced by zero.

pub mod score;
pub mod unit_price;

pub use score::{
    adjusted_review, price_bounds, price_score, rank, score, score_cohort, PriceBounds,
};
pub use unit_price::{cmp_unit_price, discount_percent, normalize, price_listing};
