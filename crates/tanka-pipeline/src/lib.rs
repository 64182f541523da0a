//! Category runs: outbound gate → scrape → extract → price → score → rank.
//!
//! [`Pipeline`] wires the scraper, the attribute extractor and the scoring
//! engine together. Both binaries build one from [`tanka_core::AppConfig`];
//! tests build one around a fake fetcher.

pub mod error;
pub mod runner;

pub use error::PipelineError;
pub use runner::{
    build_extractor, build_outbound_gate, replace_listing, CategoryOutcome, Pipeline,
};
