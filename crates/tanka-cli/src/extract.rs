//! `extract` debug command.

use serde_json::json;
use tanka_core::{AppConfig, Measure};
use tanka_extract::{normalize, AttributeExtractor};
use tanka_pipeline::build_extractor;

/// Prints the normalized text and the attributes extracted from it.
///
/// Without `--measure` only the heuristic passes run.
pub(crate) async fn extract(
    config: &AppConfig,
    title: &str,
    description: Option<&str>,
    measure: Option<Measure>,
) -> anyhow::Result<()> {
    let attributes = match measure {
        Some(measure) => {
            build_extractor(config)?
                .extract_for(title, description, measure)
                .await
        }
        None => AttributeExtractor::new().extract(title, description),
    };

    let out = json!({
        "normalized": normalize(title),
        "attributes": attributes,
        "total": measure.map(|m| json!({ "measure": m, "value": attributes.total_for(m) })),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
