use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::usecase::ports::ai::{CompletionBackend, CompletionRequest, ModelTier};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_INSIGHTS_MODEL: &str = "gemini-1.5-pro";
pub const PLACEHOLDER_API_KEY: &str = "your-gemini-api-key-here";

const API_KEY_HEADER: &str = "x-goog-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f32 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 1000;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    insights_model: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            insights_model: DEFAULT_INSIGHTS_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    pub fn with_models(
        mut self,
        model: impl Into<String>,
        insights_model: impl Into<String>,
    ) -> Self {
        self.model = model.into();
        self.insights_model = insights_model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.model,
            ModelTier::Insights => &self.insights_model,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }
}

/// Descriptive message for a non-success HTTP status.
pub fn describe_status(status: u16, body: &str) -> String {
    match status {
        400 => "Bad Request - Invalid parameters or prompt".to_string(),
        401 => "Unauthorized - Invalid API key".to_string(),
        403 => "Forbidden - API key lacks required permissions".to_string(),
        429 => "Rate Limit Exceeded - Too many requests".to_string(),
        500..=599 => "Internal Server Error - Service temporarily unavailable".to_string(),
        _ => format!("API Error {status}: {}", body.trim()),
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    fn is_configured(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && key != PLACEHOLDER_API_KEY
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let model = self.model_for(request.tier);
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: Some(request.prompt),
                }],
                role: Some("user".to_string()),
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(TEMPERATURE),
                max_output_tokens: Some(MAX_OUTPUT_TOKENS),
            }),
        };

        debug!(model, "sending generateContent request");
        // The key travels in a header and reqwest errors drop the URL, so
        // neither the key nor the endpoint ends up in error text.
        let response = self
            .client
            .post(self.endpoint(model))
            .header("Content-Type", "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("request to Gemini failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), model, "Gemini returned an error");
            return Err(anyhow!(describe_status(status.as_u16(), &error_text)));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("failed to decode Gemini response")?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| anyhow!("Gemini response contained no text"))?;

        if let Some(usage) = parsed.usage_metadata {
            debug!(
                model,
                prompt_tokens = usage.prompt_token_count.unwrap_or(0),
                output_tokens = usage.candidates_token_count.unwrap_or(0),
                "Gemini call finished"
            );
        }

        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}
