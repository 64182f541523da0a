//! Text normalization ahead of tokenization and pattern matching.
//!
//! Marketplace titles mix full-width and half-width characters, several
//! spellings of the same unit and four or five multiplication signs. After
//! [`normalize`] every quantity reads `<number><canonical unit>`, with the
//! canonical units `ロール`, `パック`, `個`, `m`, `ml`, `l`, `kg` and `g`,
//! and every multiplication is `×` with no surrounding space.

use std::sync::LazyLock;

use regex::Regex;

/// The canonical multiplication sign.
pub const TIMES: char = '×';

const MULTIPLY_SIGNS: &[char] = &['✕', '✖', '*', '⨯'];

static DIGIT_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d),(\d{3})").expect("valid digit group regex"));

static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d+(?:\.\d+)?)\s*(ミリリットル|メートル|キログラム|リットル|グラム|キロ|ロール|巻き|巻|パック|袋|個入り|個入|個|本入り|本入|本|枚入り|枚入|コ|(?i:mm|ml|cc|kg|m|l|g)|R|P)",
    )
    .expect("valid quantity regex")
});

static LATIN_TIMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d|ロール|パック|個|ml|kg|m|l|g)\s*[xX]\s*(\d)").expect("valid latin times regex")
});

static SPACED_TIMES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*×\s*").expect("valid spaced times regex"));

/// Normalizes a raw title or description.
#[must_use]
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .map(fold_width)
        .map(|c| if MULTIPLY_SIGNS.contains(&c) { TIMES } else { c })
        .collect();
    let ungrouped = replace_until_stable(&DIGIT_GROUP, &folded, "${1}${2}");
    let units = canonicalize_units(&ungrouped);
    let times = replace_until_stable(&LATIN_TIMES, &units, "${1}×${2}");
    let tight = SPACED_TIMES.replace_all(&times, "×");
    tight.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Folds full-width ASCII variants to half-width and the ideographic space
/// to a plain space.
fn fold_width(c: char) -> char {
    match c {
        '\u{3000}' => ' ',
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(u32::from(c) - 0xFEE0).unwrap_or(c),
        _ => c,
    }
}

/// Applies `re` repeatedly so that chained matches sharing a boundary
/// (`1,000,000`, `2x3x4`) are all rewritten.
fn replace_until_stable(re: &Regex, text: &str, rep: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = re.replace_all(&current, rep).into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

fn canonicalize_units(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in QUANTITY.captures_iter(text) {
        let (Some(whole), Some(number), Some(unit)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        if !unit_boundary_ok(unit.as_str(), &text[whole.end()..]) {
            continue;
        }
        let Some(canonical) = canonical_unit(unit.as_str()) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        out.push_str(number.as_str());
        out.push_str(canonical);
        last = whole.end();
    }

    out.push_str(&text[last..]);
    out
}

/// Rejects unit matches that are really the start of a longer word:
/// `5mg`, `2Pack`, `1本体`.
fn unit_boundary_ok(unit: &str, rest: &str) -> bool {
    if unit == "本" && rest.starts_with('体') {
        return false;
    }
    if !unit.is_ascii() {
        return true;
    }
    let mut chars = rest.chars();
    match chars.next() {
        Some('x' | 'X') => chars
            .as_str()
            .trim_start()
            .starts_with(|c: char| c.is_ascii_digit()),
        Some(c) => !c.is_ascii_alphabetic(),
        None => true,
    }
}

fn canonical_unit(raw: &str) -> Option<&'static str> {
    let canonical = match raw {
        "ロール" | "巻き" | "巻" | "R" => "ロール",
        "パック" | "袋" | "P" => "パック",
        "個入り" | "個入" | "個" | "本入り" | "本入" | "本" | "枚入り" | "枚入" | "コ" => "個",
        "メートル" => "m",
        "ミリリットル" => "ml",
        "リットル" => "l",
        "キログラム" | "キロ" => "kg",
        "グラム" => "g",
        ascii => match ascii.to_ascii_lowercase().as_str() {
            "m" => "m",
            "ml" | "cc" => "ml",
            "l" => "l",
            "kg" => "kg",
            "g" => "g",
            _ => return None,
        },
    };
    Some(canonical)
}
