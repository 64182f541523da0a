use std::sync::Arc;

use tanka_core::{ExtractedAttributes, Measure};

use crate::flags::apply_flags;
use crate::llm::{needs_refinement, refine, TextGenerator};
use crate::normalize::normalize;
use crate::patterns::apply_patterns;
use crate::tokenizer::{scan_quantities, tokenize};

/// Layered attribute extraction: normalization, tokenizer, patterns, flags,
/// and an optional LLM pass.
///
/// Extraction is total. Every field is independently nullable and nothing
/// here returns an error or panics on malformed text.
#[derive(Clone, Default)]
pub struct AttributeExtractor {
    llm: Option<Arc<dyn TextGenerator>>,
}

impl AttributeExtractor {
    /// An extractor without the LLM pass.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_llm(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            llm: Some(generator),
        }
    }

    #[must_use]
    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Heuristic extraction from a title and optional description.
    ///
    /// The title is authoritative; the description only fills fields the
    /// title left empty.
    #[must_use]
    pub fn extract(&self, title: &str, description: Option<&str>) -> ExtractedAttributes {
        let mut attrs = extract_text(&normalize(title));
        if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
            let extra = extract_text(&normalize(description));
            attrs.fill_missing_from(&extra);
        }
        attrs
    }

    /// [`Self::extract`] followed by the LLM pass when one is configured and
    /// the divisor attribute for `measure` is still unknown.
    pub async fn extract_for(
        &self,
        title: &str,
        description: Option<&str>,
        measure: Measure,
    ) -> ExtractedAttributes {
        let mut attrs = self.extract(title, description);
        if let Some(generator) = &self.llm {
            if needs_refinement(&attrs, measure) {
                let mut text = normalize(title);
                if let Some(description) = description {
                    text.push(' ');
                    text.push_str(&normalize(description));
                }
                refine(generator.as_ref(), &text, measure, &mut attrs).await;
            }
        }
        attrs
    }
}

impl std::fmt::Debug for AttributeExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeExtractor")
            .field("llm", &self.llm.is_some())
            .finish()
    }
}

/// Tokenizer first, then patterns into the gaps, then flags; totals last.
fn extract_text(normalized: &str) -> ExtractedAttributes {
    let tokens = tokenize(normalized);
    let mut attrs = scan_quantities(&tokens);
    apply_patterns(normalized, &mut attrs);
    apply_flags(normalized, &mut attrs);
    attrs.derive_totals();
    attrs
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
