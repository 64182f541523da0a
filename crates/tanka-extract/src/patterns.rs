//! Ordered regex patterns over normalized text.
//!
//! Patterns are the second numeric pass. They see quantities the tokenizer
//! skips, such as a count glued to a model code (`W12ロール`), but they only
//! ever fill fields that are still `None`.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tanka_core::ExtractedAttributes;

use crate::tokenizer::fill_count_group;

struct Pattern {
    regex: Regex,
    apply: fn(&Captures<'_>, &mut ExtractedAttributes),
}

impl Pattern {
    fn new(re: &str, apply: fn(&Captures<'_>, &mut ExtractedAttributes)) -> Self {
        Self {
            regex: Regex::new(re).expect("valid attribute pattern"),
            apply,
        }
    }
}

static PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        Pattern::new(r"(\d+)ロール×(\d+)パック", |c, a| {
            fill_count_group(a, count(c, 1), count(c, 2));
        }),
        Pattern::new(r"(\d+(?:\.\d+)?)(?:ml|l|kg|g|m)×(\d+)", |c, a| {
            fill(&mut a.unit_count, count(c, 2));
        }),
        Pattern::new(r"(\d+)ロール", |c, a| fill(&mut a.unit_count, count(c, 1))),
        // A pack count after `×` belongs to a group handled above.
        Pattern::new(r"(?:^|[^×\d])(\d+)パック", |c, a| {
            fill(&mut a.pack_multiplier, count(c, 1));
        }),
        Pattern::new(r"(\d+(?:\.\d+)?)m(?:[^a-zA-Z]|$)", |c, a| {
            fill(&mut a.unit_length_m, measure(c, 1));
        }),
        Pattern::new(r"(\d+(?:\.\d+)?)ml", |c, a| fill(&mut a.volume_ml, measure(c, 1))),
        Pattern::new(r"(\d+(?:\.\d+)?)l(?:[^a-zA-Z]|$)", |c, a| {
            fill(&mut a.volume_ml, measure(c, 1).map(|v| v * 1000.0));
        }),
        Pattern::new(r"(\d+(?:\.\d+)?)kg", |c, a| fill(&mut a.weight_kg, measure(c, 1))),
        Pattern::new(r"(\d+(?:\.\d+)?)g(?:[^a-zA-Z]|$)", |c, a| {
            fill(&mut a.weight_kg, measure(c, 1).map(|v| v / 1000.0));
        }),
        Pattern::new(r"(\d+)個", |c, a| fill(&mut a.unit_count, count(c, 1))),
    ]
});

/// Runs every pattern in order against `normalized`, filling only fields
/// that are still `None`.
pub fn apply_patterns(normalized: &str, attrs: &mut ExtractedAttributes) {
    for pattern in PATTERNS.iter() {
        if let Some(caps) = pattern.regex.captures(normalized) {
            (pattern.apply)(&caps, attrs);
        }
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn count(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?
        .as_str()
        .parse::<u32>()
        .ok()
        .filter(|&n| n > 0)
}

fn measure(caps: &Captures<'_>, group: usize) -> Option<f64> {
    caps.get(group)?
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}
