//! Lexicon-driven tokenizer over normalized text.
//!
//! Splits normalized text into part-of-speech tagged tokens and scans
//! `(Number, Unit)` adjacency pairs for quantities. This pass is the most
//! trusted numeric source: patterns and the LLM pass only fill what it
//! leaves empty.

use tanka_core::ExtractedAttributes;

use crate::normalize::TIMES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Roll,
    Pack,
    Piece,
    Metre,
    Millilitre,
    Litre,
    Kilogram,
    Gram,
}

impl UnitKind {
    fn is_count(self) -> bool {
        matches!(self, UnitKind::Roll | UnitKind::Piece)
    }
}

/// Canonical unit spellings produced by normalization, longest first.
const UNIT_LEXICON: &[(&str, UnitKind)] = &[
    ("ロール", UnitKind::Roll),
    ("パック", UnitKind::Pack),
    ("個", UnitKind::Piece),
    ("ml", UnitKind::Millilitre),
    ("kg", UnitKind::Kilogram),
    ("m", UnitKind::Metre),
    ("l", UnitKind::Litre),
    ("g", UnitKind::Gram),
];

const SYMBOLS: &str = "【】「」『』（）()[]［］〔〕｛｝{}〈〉《》・、。,.!?！？/／~〜～:：;；※★☆◆◇■□●○♪+＋-=＝&＆%％#＃@＠|｜\"'";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartOfSpeech {
    Number,
    Unit(UnitKind),
    Multiply,
    Word,
    Symbol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub pos: PartOfSpeech,
}

impl<'a> Token<'a> {
    fn new(text: &'a str, pos: PartOfSpeech) -> Self {
        Self { text, pos }
    }
}

/// Tokenizes normalized text. Whitespace separates tokens and is dropped.
///
/// A unit is only recognised directly after a number; elsewhere the same
/// characters are part of a word.
#[must_use]
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens: Vec<Token<'_>> = Vec::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        let after_number = tokens
            .last()
            .is_some_and(|t| t.pos == PartOfSpeech::Number);

        let (len, pos) = if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
            continue;
        } else if c.is_ascii_digit() {
            (number_len(rest), PartOfSpeech::Number)
        } else if c == TIMES {
            (c.len_utf8(), PartOfSpeech::Multiply)
        } else if let Some((unit, kind)) = after_number.then(|| match_unit(rest)).flatten() {
            (unit.len(), PartOfSpeech::Unit(kind))
        } else if SYMBOLS.contains(c) {
            (c.len_utf8(), PartOfSpeech::Symbol)
        } else if c.is_ascii_alphabetic() {
            (run_len(rest, |ch| ch.is_ascii_alphanumeric()), PartOfSpeech::Word)
        } else {
            (run_len(rest, is_word_char), PartOfSpeech::Word)
        };

        tokens.push(Token::new(&rest[..len], pos));
        rest = &rest[len..];
    }

    tokens
}

/// Scans `(Number, Unit)` pairs and fills quantity fields. The first
/// occurrence of each field wins.
///
/// A `×` after a count pair (`12ロール×4`) makes the next number the pack
/// multiplier; a `×` after a measure pair (`400ml×3`) makes it the unit
/// count. A count group only sets the multiplier together with its own
/// count, see [`fill_count_group`].
#[must_use]
pub fn scan_quantities(tokens: &[Token<'_>]) -> ExtractedAttributes {
    let mut attrs = ExtractedAttributes::default();
    let mut i = 0;

    while i < tokens.len() {
        let (Some(number), Some(PartOfSpeech::Unit(kind))) =
            (parse_number(&tokens[i]), tokens.get(i + 1).map(|t| t.pos))
        else {
            i += 1;
            continue;
        };

        let factor = multiplied_by(tokens, i + 2);

        if kind.is_count() {
            fill_count_group(&mut attrs, as_count(number), factor.and_then(as_count));
        } else if kind == UnitKind::Pack {
            set_once(&mut attrs.pack_multiplier, as_count(number));
        } else {
            let value = positive(number);
            match kind {
                UnitKind::Metre => set_once(&mut attrs.unit_length_m, value),
                UnitKind::Millilitre => set_once(&mut attrs.volume_ml, value),
                UnitKind::Litre => set_once(&mut attrs.volume_ml, value.map(|v| v * 1000.0)),
                UnitKind::Kilogram => set_once(&mut attrs.weight_kg, value),
                UnitKind::Gram => set_once(&mut attrs.weight_kg, value.map(|v| v / 1000.0)),
                UnitKind::Roll | UnitKind::Pack | UnitKind::Piece => {}
            }
            if let Some(count) = factor {
                set_once(&mut attrs.unit_count, as_count(count));
            }
        }

        // Skip the pair and, when present, the `× N [unit]` tail it consumed.
        i += if factor.is_some() {
            let tail_unit = matches!(
                tokens.get(i + 4).map(|t| t.pos),
                Some(PartOfSpeech::Unit(_))
            );
            if tail_unit {
                5
            } else {
                4
            }
        } else {
            2
        };
    }

    attrs
}

/// Fills `unit_count` and `pack_multiplier` from one `count × mult` group.
///
/// Both are set together or not at all. When a count is already known and
/// equals `count * mult`, it was the total of this breakdown
/// (`48ロール(12ロール×4パック)`), so the breakdown replaces it. A group that
/// describes a different quantity leaves both fields alone.
pub(crate) fn fill_count_group(
    attrs: &mut ExtractedAttributes,
    count: Option<u32>,
    mult: Option<u32>,
) {
    let Some(mult) = mult else {
        set_once(&mut attrs.unit_count, count);
        return;
    };
    let Some(count) = count else {
        return;
    };
    match (attrs.unit_count, attrs.pack_multiplier) {
        (None, None) => {
            attrs.unit_count = Some(count);
            attrs.pack_multiplier = Some(mult);
        }
        (Some(total), None) if count.checked_mul(mult) == Some(total) => {
            attrs.unit_count = Some(count);
            attrs.pack_multiplier = Some(mult);
        }
        _ => {}
    }
}

fn multiplied_by(tokens: &[Token<'_>], at: usize) -> Option<f64> {
    let times = tokens.get(at)?;
    if times.pos != PartOfSpeech::Multiply {
        return None;
    }
    parse_number(tokens.get(at + 1)?)
}

fn parse_number(token: &Token<'_>) -> Option<f64> {
    if token.pos != PartOfSpeech::Number {
        return None;
    }
    token.text.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn positive(value: f64) -> Option<f64> {
    (value > 0.0).then_some(value)
}

/// Accepts whole, positive counts only.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn as_count(value: f64) -> Option<u32> {
    if value.fract() != 0.0 || value < 1.0 || value > f64::from(u32::MAX) {
        return None;
    }
    Some(value as u32)
}

fn set_once<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn number_len(s: &str) -> usize {
    let int_len = prefix_len(s, |c| c.is_ascii_digit());
    let rest = &s[int_len..];
    if let Some(frac) = rest.strip_prefix('.') {
        let frac_len = prefix_len(frac, |c| c.is_ascii_digit());
        if frac_len > 0 {
            return int_len + 1 + frac_len;
        }
    }
    int_len
}

fn match_unit(s: &str) -> Option<(&'static str, UnitKind)> {
    UNIT_LEXICON.iter().copied().find(|(unit, _)| {
        s.starts_with(unit)
            && (!unit.is_ascii()
                || !s[unit.len()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic()))
    })
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !c.is_ascii() && c != TIMES && !SYMBOLS.contains(c)
}

/// Byte length of the leading run of `s` whose chars satisfy `pred`.
fn prefix_len(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.chars().take_while(|&c| pred(c)).map(char::len_utf8).sum()
}

/// [`prefix_len`], but always at least one char so the tokenizer makes
/// progress.
fn run_len(s: &str, pred: impl Fn(char) -> bool) -> usize {
    let len = prefix_len(s, pred);
    if len == 0 {
        s.chars().next().map_or(0, char::len_utf8)
    } else {
        len
    }
}
