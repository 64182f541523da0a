//! Optional LLM refinement pass.
//!
//! Runs only when the heuristic passes leave the category's divisor
//! attribute empty. The model is asked for a fixed JSON shape at
//! temperature 0; the first well-formed `{…}` block in its answer is parsed
//! and may only fill fields that are still `None`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tanka_core::{ExtractedAttributes, LlmConfig, Measure};

use crate::error::ExtractError;

const MAX_COUNT: u32 = 1000;
const MAX_LENGTH_M: f64 = 1000.0;
const MAX_VOLUME_ML: f64 = 50_000.0;
const MAX_WEIGHT_KG: f64 = 100.0;

const SYSTEM_PROMPT: &str = "You extract product quantities from Japanese e-commerce titles. \
Answer with one JSON object and nothing else. Use null for anything not stated in the text.";

/// A text-generation backend. Implementations must use deterministic
/// decoding and a bounded timeout.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ExtractError`] when the backend cannot produce text.
    async fn generate(&self, prompt: &str) -> Result<String, ExtractError>;
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint
/// (OpenAI, Ollama, vLLM, llama.cpp server).
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    content: Option<String>,
}

impl OpenAiCompatibleClient {
    /// # Errors
    ///
    /// Returns [`ExtractError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/v1/chat/completions", config.url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleClient {
    async fn generate(&self, prompt: &str) -> Result<String, ExtractError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(ExtractError::Status {
                status: response.status().as_u16(),
            });
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ExtractError::EmptyResponse)
    }
}

/// The JSON shape requested from the model.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LlmAttributes {
    unit_count: Option<u32>,
    pack_multiplier: Option<u32>,
    unit_length_m: Option<f64>,
    volume_ml: Option<f64>,
    weight_kg: Option<f64>,
    ply: Option<String>,
    is_refill: Option<bool>,
}

impl LlmAttributes {
    /// Converts to attributes, dropping values outside sane bounds.
    fn into_bounded(self) -> ExtractedAttributes {
        let count = |v: Option<u32>| v.filter(|n| (1..=MAX_COUNT).contains(n));
        let within = |v: Option<f64>, max: f64| v.filter(|x| x.is_finite() && *x > 0.0 && *x <= max);
        ExtractedAttributes {
            unit_count: count(self.unit_count),
            pack_multiplier: count(self.pack_multiplier),
            unit_length_m: within(self.unit_length_m, MAX_LENGTH_M),
            volume_ml: within(self.volume_ml, MAX_VOLUME_ML),
            weight_kg: within(self.weight_kg, MAX_WEIGHT_KG),
            ply_is_double: match self.ply.as_deref().map(str::to_ascii_lowercase).as_deref() {
                Some("double") => Some(true),
                Some("single") => Some(false),
                _ => None,
            },
            is_refill: self.is_refill,
            ..ExtractedAttributes::default()
        }
    }
}

/// Returns `true` when the attribute that divides the price for `measure`
/// is still unknown.
#[must_use]
pub fn needs_refinement(attrs: &ExtractedAttributes, measure: Measure) -> bool {
    attrs.total_for(measure).is_none()
}

pub(crate) fn build_prompt(normalized: &str, measure: Measure) -> String {
    format!(
        "Product text: {normalized}\n\
         Category unit: {measure}\n\
         Return JSON with exactly these keys: \
         {{\"unit_count\": integer|null, \"pack_multiplier\": integer|null, \
         \"unit_length_m\": number|null, \"volume_ml\": number|null, \
         \"weight_kg\": number|null, \"ply\": \"single\"|\"double\"|null, \
         \"is_refill\": boolean|null}}"
    )
}

/// Asks `generator` for attributes and merges them into `attrs`.
///
/// Any failure leaves `attrs` untouched; this pass never errors outward.
pub(crate) async fn refine(
    generator: &dyn TextGenerator,
    normalized: &str,
    measure: Measure,
    attrs: &mut ExtractedAttributes,
) {
    let prompt = build_prompt(normalized, measure);
    let parsed = match generator.generate(&prompt).await {
        Ok(text) => parse_answer(&text),
        Err(e) => Err(e),
    };

    match parsed {
        Ok(found) => {
            attrs.fill_missing_from(&found);
            tracing::debug!(measure = %measure, "llm refinement applied");
        }
        Err(e) => {
            tracing::warn!(error = %e, "llm refinement failed, keeping heuristic attributes");
        }
    }
}

fn parse_answer(text: &str) -> Result<ExtractedAttributes, ExtractError> {
    let block = first_json_object(text).ok_or(ExtractError::NoJsonBlock)?;
    let raw: LlmAttributes = serde_json::from_str(block)?;
    Ok(raw.into_bounded())
}

/// Returns the first balanced `{…}` block in `text`, respecting JSON strings.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
