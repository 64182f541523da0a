//! Binary flags from keyword containment.
//!
//! Independent of the numeric passes. When keywords for both values are
//! present the flag stays `None`.

use tanka_core::ExtractedAttributes;

const DOUBLE_PLY: &[&str] = &["ダブル", "double", "2枚重ね"];
const SINGLE_PLY: &[&str] = &["シングル", "single", "1枚重ね"];
const REFILL: &[&str] = &["詰め替え", "詰め換え", "詰替", "つめかえ", "refill"];
const MAIN_BOTTLE: &[&str] = &["本体"];

/// Fills `ply_is_double` and `is_refill` when they are still `None`.
pub fn apply_flags(normalized: &str, attrs: &mut ExtractedAttributes) {
    let lower = normalized.to_lowercase();
    if attrs.ply_is_double.is_none() {
        attrs.ply_is_double = keyword_flag(&lower, DOUBLE_PLY, SINGLE_PLY);
    }
    if attrs.is_refill.is_none() {
        attrs.is_refill = keyword_flag(&lower, REFILL, MAIN_BOTTLE);
    }
}

fn keyword_flag(lower: &str, yes: &[&str], no: &[&str]) -> Option<bool> {
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    match (has(yes), has(no)) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}
