use thiserror::Error;

/// Failures of the LLM client.
///
/// Only client construction surfaces these to callers. During extraction a
/// failed refinement pass is logged and leaves the heuristic result as is.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("text generation endpoint returned status {status}")]
    Status { status: u16 },

    #[error("text generation response had no choices")]
    EmptyResponse,

    #[error("no JSON object found in generated text")]
    NoJsonBlock,

    #[error("generated JSON did not match the attribute shape: {0}")]
    Json(#[from] serde_json::Error),
}
