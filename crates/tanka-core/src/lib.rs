//! Shared record types and configuration for the tanka workspace.
//!
//! Every other crate depends on this one: the scraper produces
//! [`RawListing`]s, the extractor fills [`ExtractedAttributes`], and the
//! scoring crate turns them into [`PricedListing`]s and [`ScoredListing`]s.

pub mod app_config;
pub mod categories;
pub mod config;
pub mod listings;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, InboundLimit, LlmConfig};
pub use categories::{
    load_categories, CategoriesFile, CategoryConfig, Measure, MissingPricePolicy, ScoringConfig,
    ScoringOverrides,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use listings::{CategoryRun, ExtractedAttributes, PricedListing, RawListing, ScoredListing};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read categories file {path}: {source}")]
    CategoriesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse categories file: {0}")]
    CategoriesFileParse(#[from] serde_yaml::Error),

    #[error("categories validation failed: {0}")]
    Validation(String),
}
