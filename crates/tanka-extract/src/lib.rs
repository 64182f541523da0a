//! Attribute extraction from Japanese marketplace titles.
//!
//! [`AttributeExtractor::extract`] is a pure, total function from a title
//! (and optional description) to [`tanka_core::ExtractedAttributes`].

pub mod error;
pub mod extractor;
pub mod flags;
pub mod llm;
pub mod normalize;
pub mod patterns;
pub mod tokenizer;

pub use error::ExtractError;
pub use extractor::AttributeExtractor;
pub use llm::{needs_refinement, OpenAiCompatibleClient, TextGenerator};
pub use normalize::normalize;
pub use tokenizer::{tokenize, PartOfSpeech, Token, UnitKind};
