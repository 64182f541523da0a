use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tanka_core::{
    AppConfig, CategoryConfig, CategoryRun, PricedListing, RawListing, ScoredListing,
    ScoringConfig,
};
use tanka_extract::{AttributeExtractor, OpenAiCompatibleClient};
use tanka_scoring::{price_listing, rank, score_cohort};
use tanka_scraper::{
    HttpFetcher, MarketplaceScraper, OutboundGate, OutboundGateConfig, PageFetcher, ScraperConfig,
};

use crate::error::PipelineError;

/// Builds the process-wide outbound gate from the `TANKA_SCRAPER_*` settings.
#[must_use]
pub fn build_outbound_gate(config: &AppConfig) -> Arc<OutboundGate> {
    Arc::new(OutboundGate::new(OutboundGateConfig {
        min_interval_ms: config.scraper_min_interval_ms,
        max_interval_ms: config.scraper_max_interval_ms,
        hourly_cap: config.scraper_hourly_cap,
    }))
}

/// Builds the attribute extractor, with the LLM pass when `TANKA_LLM_URL`
/// is set.
///
/// # Errors
///
/// Returns [`PipelineError::LlmSetup`] if the LLM HTTP client cannot be built.
pub fn build_extractor(config: &AppConfig) -> Result<AttributeExtractor, PipelineError> {
    let Some(llm) = &config.llm else {
        return Ok(AttributeExtractor::new());
    };
    let client = OpenAiCompatibleClient::new(llm)?;
    tracing::info!(url = %llm.url, model = %llm.model, "llm extraction pass enabled");
    Ok(AttributeExtractor::with_llm(Arc::new(client)))
}

/// Result of one category in a multi-category run.
#[derive(Debug)]
pub struct CategoryOutcome {
    pub slug: String,
    pub result: Result<CategoryRun, PipelineError>,
}

pub struct Pipeline<F = HttpFetcher> {
    scraper: MarketplaceScraper<F>,
    extractor: AttributeExtractor,
    scoring: ScoringConfig,
    max_concurrent: usize,
}

impl Pipeline<HttpFetcher> {
    /// Builds an HTTP-backed pipeline.
    ///
    /// `scoring` holds the file-level defaults from `categories.yaml`;
    /// per-category overrides are resolved at run time.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ScraperSetup`] for an unusable marketplace
    /// base URL and [`PipelineError::LlmSetup`] if the LLM client fails.
    pub fn from_app_config(
        config: &AppConfig,
        scoring: ScoringConfig,
        gate: Arc<OutboundGate>,
    ) -> Result<Self, PipelineError> {
        let scraper = MarketplaceScraper::new(&ScraperConfig::from_app_config(config), gate)
            .map_err(PipelineError::ScraperSetup)?;
        let extractor = build_extractor(config)?;
        Ok(Self::new(scraper, extractor, scoring)
            .with_max_concurrent(config.max_concurrent_categories))
    }
}

impl<F: PageFetcher> Pipeline<F> {
    #[must_use]
    pub fn new(
        scraper: MarketplaceScraper<F>,
        extractor: AttributeExtractor,
        scoring: ScoringConfig,
    ) -> Self {
        Self {
            scraper,
            extractor,
            scoring,
            max_concurrent: 1,
        }
    }

    /// Number of categories [`Self::run_categories`] scrapes at once.
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    #[must_use]
    pub fn scoring_for(&self, category: &CategoryConfig) -> ScoringConfig {
        category.scoring(&self.scoring)
    }

    /// Runs one category end to end.
    ///
    /// Zero search results is a valid, empty run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Scrape`] when the marketplace cannot be
    /// searched; [`PipelineError::is_quota`] tells a closed quota apart.
    pub async fn run_category(
        &self,
        category: &CategoryConfig,
    ) -> Result<CategoryRun, PipelineError> {
        let started_at = Utc::now();
        tracing::info!(
            category = %category.slug,
            keyword = %category.keyword,
            measure = %category.measure,
            "category run started"
        );

        let raw = self
            .scraper
            .search(&category.keyword)
            .await
            .map_err(|e| PipelineError::scrape(&category.slug, e))?;

        let mut priced = Vec::with_capacity(raw.len());
        for listing in raw {
            priced.push(self.price(listing, category).await);
        }
        let with_unit_price = priced.iter().filter(|p| p.unit_price.is_some()).count();
        let listings = self.rescore(priced, category);

        tracing::info!(
            category = %category.slug,
            listings = listings.len(),
            with_unit_price,
            "category run finished"
        );

        Ok(CategoryRun {
            category: category.slug.clone(),
            keyword: category.keyword.clone(),
            started_at,
            finished_at: Utc::now(),
            listings,
        })
    }

    /// Runs every category, at most `max_concurrent` at a time.
    ///
    /// A failing category is logged and does not stop the others. Outcomes
    /// come back in the order of `categories`.
    pub async fn run_categories(&self, categories: &[CategoryConfig]) -> Vec<CategoryOutcome> {
        let mut outcomes: Vec<(usize, CategoryOutcome)> = stream::iter(categories.iter().enumerate())
            .map(|(index, category)| async move {
                let result = self.run_category(category).await;
                if let Err(e) = &result {
                    tracing::error!(
                        category = %category.slug,
                        error = %e,
                        quota = e.is_quota(),
                        "category run failed"
                    );
                }
                (
                    index,
                    CategoryOutcome {
                        slug: category.slug.clone(),
                        result,
                    },
                )
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let failed = outcomes.iter().filter(|(_, o)| o.result.is_err()).count();
        if failed > 0 {
            tracing::warn!(
                failed,
                total = categories.len(),
                "some categories failed"
            );
        }

        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    /// Searches the marketplace for a single listing by id and re-prices it.
    ///
    /// Returns `Ok(None)` when the search does not surface that id.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Scrape`] when the search fails.
    pub async fn refetch_listing(
        &self,
        category: &CategoryConfig,
        source_id: &str,
    ) -> Result<Option<PricedListing>, PipelineError> {
        let found = self
            .scraper
            .search(source_id)
            .await
            .map_err(|e| PipelineError::scrape(&category.slug, e))?
            .into_iter()
            .find(|l| l.source_id == source_id);

        let Some(listing) = found else {
            tracing::warn!(category = %category.slug, source_id, "refetch did not find listing");
            return Ok(None);
        };
        Ok(Some(self.price(listing, category).await))
    }

    /// Scores and ranks a cohort under the category's scoring constants.
    #[must_use]
    pub fn rescore(
        &self,
        cohort: Vec<PricedListing>,
        category: &CategoryConfig,
    ) -> Vec<ScoredListing> {
        rank(score_cohort(cohort, &self.scoring_for(category)))
    }

    async fn price(&self, listing: RawListing, category: &CategoryConfig) -> PricedListing {
        let attributes = self
            .extractor
            .extract_for(&listing.title, listing.description.as_deref(), category.measure)
            .await;
        let priced = price_listing(listing, attributes, category.measure);
        if priced.unit_price.is_none() {
            tracing::debug!(
                category = %category.slug,
                source_id = %priced.listing.source_id,
                "no unit price for listing"
            );
        }
        priced
    }
}

/// Swaps `updated` into a scored cohort, replacing the member with the same
/// `source_id` or appending it. The result is unscored, ready for
/// [`Pipeline::rescore`].
#[must_use]
pub fn replace_listing(cohort: Vec<ScoredListing>, updated: PricedListing) -> Vec<PricedListing> {
    let mut updated = Some(updated);
    let mut merged: Vec<PricedListing> = cohort
        .into_iter()
        .map(|scored| match updated.take_if(|u| u.listing.source_id == scored.source_id()) {
            Some(replacement) => replacement,
            None => scored.priced,
        })
        .collect();
    merged.extend(updated);
    merged
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
