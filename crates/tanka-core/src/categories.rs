use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// The physical quantity a category's unit price is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    /// Price per metre (roll goods).
    Length,
    /// Price per litre (liquids).
    Volume,
    /// Price per kilogram (bulk commodities).
    Weight,
    /// Price per item.
    Count,
}

impl Measure {
    /// Label of the unit the normalized price is quoted per.
    #[must_use]
    pub fn unit_label(self) -> &'static str {
        match self {
            Measure::Length => "m",
            Measure::Volume => "l",
            Measure::Weight => "kg",
            Measure::Count => "item",
        }
    }
}

impl std::fmt::Display for Measure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Measure::Length => write!(f, "length"),
            Measure::Volume => write!(f, "volume"),
            Measure::Weight => write!(f, "weight"),
            Measure::Count => write!(f, "count"),
        }
    }
}

/// What the scoring engine does with a listing that has no unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPricePolicy {
    /// Score the listing on its adjusted review alone.
    #[default]
    ReviewOnly,
    /// Keep the weighted sum and count the price component as zero.
    ZeroContribution,
}

/// Constants for the Bayesian review smoothing and the final weighted sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Pseudo-count `C` pulling low-sample ratings toward the prior.
    #[serde(default = "default_confidence_count")]
    pub confidence_count: f64,
    /// Prior mean `m` on the 0–5 star scale.
    #[serde(default = "default_prior_mean")]
    pub prior_mean: f64,
    #[serde(default = "default_weight")]
    pub review_weight: f64,
    #[serde(default = "default_weight")]
    pub price_weight: f64,
    #[serde(default)]
    pub missing_price: MissingPricePolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            confidence_count: default_confidence_count(),
            prior_mean: default_prior_mean(),
            review_weight: default_weight(),
            price_weight: default_weight(),
            missing_price: MissingPricePolicy::default(),
        }
    }
}

fn default_confidence_count() -> f64 {
    10.0
}

fn default_prior_mean() -> f64 {
    3.5
}

fn default_weight() -> f64 {
    0.5
}

/// Per-category overrides of the file-level [`ScoringConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringOverrides {
    pub confidence_count: Option<f64>,
    pub prior_mean: Option<f64>,
    pub review_weight: Option<f64>,
    pub price_weight: Option<f64>,
    pub missing_price: Option<MissingPricePolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// URL-safe identifier, e.g. `"toilet-paper"`.
    pub slug: String,
    /// Display name, e.g. `"トイレットペーパー"`.
    pub name: String,
    /// Marketplace search query.
    pub keyword: String,
    /// Divisor used for the category's unit price.
    pub measure: Measure,
    #[serde(default)]
    pub scoring: Option<ScoringOverrides>,
}

impl CategoryConfig {
    /// Resolves this category's scoring constants against the file defaults.
    #[must_use]
    pub fn scoring(&self, defaults: &ScoringConfig) -> ScoringConfig {
        let Some(o) = self.scoring else {
            return *defaults;
        };
        ScoringConfig {
            confidence_count: o.confidence_count.unwrap_or(defaults.confidence_count),
            prior_mean: o.prior_mean.unwrap_or(defaults.prior_mean),
            review_weight: o.review_weight.unwrap_or(defaults.review_weight),
            price_weight: o.price_weight.unwrap_or(defaults.price_weight),
            missing_price: o.missing_price.unwrap_or(defaults.missing_price),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoriesFile {
    #[serde(default)]
    pub scoring: ScoringConfig,
    pub categories: Vec<CategoryConfig>,
}

impl CategoriesFile {
    #[must_use]
    pub fn find(&self, slug: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.slug == slug)
    }
}

/// Load and validate the categories configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_categories(path: &Path) -> Result<CategoriesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CategoriesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_categories(&content)
}

/// Parse and validate categories YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_categories(content: &str) -> Result<CategoriesFile, ConfigError> {
    let file: CategoriesFile = serde_yaml::from_str(content)?;
    validate_categories(&file)?;
    Ok(file)
}

fn validate_categories(file: &CategoriesFile) -> Result<(), ConfigError> {
    validate_scoring("defaults", &file.scoring)?;

    let mut seen_slugs = HashSet::new();
    for category in &file.categories {
        let slug = category.slug.trim();
        if slug.is_empty() {
            return Err(ConfigError::Validation(
                "category slug must be non-empty".to_string(),
            ));
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ConfigError::Validation(format!(
                "category slug '{slug}' must be lowercase ascii, digits, or '-'"
            )));
        }
        if !seen_slugs.insert(slug.to_string()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category slug: '{slug}'"
            )));
        }
        if category.keyword.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "category '{slug}' has an empty keyword"
            )));
        }
        validate_scoring(slug, &category.scoring(&file.scoring))?;
    }

    Ok(())
}

fn validate_scoring(scope: &str, scoring: &ScoringConfig) -> Result<(), ConfigError> {
    if !(0.0..=5.0).contains(&scoring.prior_mean) {
        return Err(ConfigError::Validation(format!(
            "{scope}: prior_mean {} must be within 0..=5",
            scoring.prior_mean
        )));
    }
    if scoring.confidence_count < 0.0 || !scoring.confidence_count.is_finite() {
        return Err(ConfigError::Validation(format!(
            "{scope}: confidence_count {} must be a non-negative number",
            scoring.confidence_count
        )));
    }
    if scoring.review_weight < 0.0 || scoring.price_weight < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{scope}: score weights must be non-negative"
        )));
    }

    let sum = scoring.review_weight + scoring.price_weight;
    if (sum - 1.0).abs() > 1e-6 {
        tracing::warn!(
            scope,
            review_weight = scoring.review_weight,
            price_weight = scoring.price_weight,
            "score weights do not sum to 1.0; scores may fall outside the expected spread"
        );
    }

    Ok(())
}

#[cfg(test)]
#[path = "categories_test.rs"]
mod tests;
