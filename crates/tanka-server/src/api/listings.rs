use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tanka_core::{Measure, ScoredListing};
use tanka_pipeline::replace_listing;

use crate::middleware::RequestId;

use super::{
    find_category, map_pipeline_error, normalize_limit, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

const MAX_SOURCE_ID_LEN: usize = 32;

#[derive(Debug, Serialize)]
pub(super) struct CategoryItem {
    slug: String,
    name: String,
    keyword: String,
    measure: Measure,
    unit: &'static str,
    listing_count: usize,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(super) struct ListingsPage {
    category: String,
    measure: Measure,
    unit: &'static str,
    updated_at: Option<DateTime<Utc>>,
    total: usize,
    listings: Vec<ScoredListing>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListingsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct RescrapeSummary {
    category: String,
    keyword: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    scraped: usize,
    stored: usize,
}

pub(super) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<CategoryItem>>> {
    let data = state
        .categories
        .categories
        .iter()
        .map(|c| {
            let snapshot = state.store.snapshot(&c.slug);
            CategoryItem {
                slug: c.slug.clone(),
                name: c.name.clone(),
                keyword: c.keyword.clone(),
                measure: c.measure,
                unit: c.measure.unit_label(),
                listing_count: snapshot.listings.len(),
                updated_at: snapshot.updated_at,
            }
        })
        .collect();

    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn list_listings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Query(query): Query<ListingsQuery>,
) -> Result<Json<ApiResponse<ListingsPage>>, ApiError> {
    let category = find_category(&state, &slug, &req_id.0)?;
    let snapshot = state.store.snapshot(&category.slug);
    let total = snapshot.listings.len();
    let listings = snapshot
        .listings
        .into_iter()
        .take(normalize_limit(query.limit))
        .collect();

    Ok(Json(ApiResponse {
        data: ListingsPage {
            category: category.slug.clone(),
            measure: category.measure,
            unit: category.measure.unit_label(),
            updated_at: snapshot.updated_at,
            total,
            listings,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Runs the category again and rescores the stored cohort with the fresh
/// records merged in.
pub(super) async fn rescrape_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<RescrapeSummary>>, ApiError> {
    let category = find_category(&state, &slug, &req_id.0)?;
    let run = state
        .pipeline
        .run_category(category)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    let scraped = run.listings.len();
    state.store.upsert(&category.slug, run.listings);
    let stored = state.store.update(&category.slug, |current| {
        let cohort = current.into_iter().map(|l| l.priced).collect();
        state.pipeline.rescore(cohort, category)
    });

    Ok(Json(ApiResponse {
        data: RescrapeSummary {
            category: run.category,
            keyword: run.keyword,
            started_at: run.started_at,
            finished_at: run.finished_at,
            scraped,
            stored,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Re-fetches one listing and rescores its category cohort.
pub(super) async fn refetch_listing(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((slug, source_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<ScoredListing>>, ApiError> {
    if source_id.is_empty()
        || source_id.len() > MAX_SOURCE_ID_LEN
        || !source_id.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "source_id must be ascii alphanumeric",
        ));
    }

    let category = find_category(&state, &slug, &req_id.0)?;
    let refetched = state
        .pipeline
        .refetch_listing(category, &source_id)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    let Some(priced) = refetched else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("listing '{source_id}' not found on the marketplace"),
        ));
    };

    let mut updated = None;
    state.store.update(&category.slug, |current| {
        let ranked = state.pipeline.rescore(replace_listing(current, priced), category);
        updated = ranked.iter().find(|l| l.source_id() == source_id).cloned();
        ranked
    });

    let listing = updated.ok_or_else(|| {
        ApiError::new(
            req_id.0.clone(),
            "internal_error",
            "refetched listing missing after rescore",
        )
    })?;

    Ok(Json(ApiResponse {
        data: listing,
        meta: ResponseMeta::new(req_id.0),
    }))
}
