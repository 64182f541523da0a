//! `run` and `categories` command handlers.
//!
//! A failing category is logged and recorded in the report; the remaining
//! categories still run. The process exits non-zero when any category
//! failed, after the report has been written.

use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use serde_json::json;
use tanka_core::{load_categories, AppConfig, CategoriesFile, CategoryConfig};
use tanka_pipeline::{build_outbound_gate, CategoryOutcome, Pipeline};

pub(crate) async fn run(
    config: &AppConfig,
    category: Option<&str>,
    output: Option<&Path>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let file = load_categories(&config.categories_path)?;
    let selected = select_categories(&file, category)?;

    if dry_run {
        let slugs: Vec<&str> = selected.iter().map(|c| c.slug.as_str()).collect();
        println!(
            "dry-run: would run {} categories: [{}]",
            selected.len(),
            slugs.join(", ")
        );
        return Ok(());
    }

    let gate = build_outbound_gate(config);
    let pipeline = Pipeline::from_app_config(config, file.scoring, gate)?;
    let outcomes = pipeline.run_categories(&selected).await;

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    let report = serde_json::to_string_pretty(&build_report(&outcomes))?;
    match output {
        Some(path) => {
            std::fs::write(path, report)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => println!("{report}"),
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} categories failed", outcomes.len());
    }
    Ok(())
}

pub(crate) fn list_categories(config: &AppConfig) -> anyhow::Result<()> {
    let file = load_categories(&config.categories_path)?;
    for category in &file.categories {
        println!(
            "{:<24} per {:<5} {}  ({})",
            category.slug,
            category.measure.unit_label(),
            category.keyword,
            category.name
        );
    }
    Ok(())
}

/// Resolves the `--category` filter against the categories file.
fn select_categories(
    file: &CategoriesFile,
    slug: Option<&str>,
) -> anyhow::Result<Vec<CategoryConfig>> {
    match slug {
        Some(slug) => {
            let category = file
                .find(slug)
                .ok_or_else(|| anyhow::anyhow!("category '{slug}' not found"))?;
            Ok(vec![category.clone()])
        }
        None => Ok(file.categories.clone()),
    }
}

fn build_report(outcomes: &[CategoryOutcome]) -> serde_json::Value {
    let runs: Vec<_> = outcomes.iter().filter_map(|o| o.result.as_ref().ok()).collect();
    let failures: Vec<_> = outcomes
        .iter()
        .filter_map(|o| {
            o.result.as_ref().err().map(|e| {
                json!({
                    "category": o.slug,
                    "error": e.to_string(),
                    "quota_exceeded": e.is_quota(),
                })
            })
        })
        .collect();

    json!({
        "generated_at": Utc::now(),
        "runs": runs,
        "failures": failures,
    })
}
