//! Gemini (Google) image generation provider.

use crate::config::{Config, API_KEY_ENV};
use crate::error::{parse_retry_after, sanitize_error_message, GenImgError, Result};
use crate::image::provider::ImageProvider;
use crate::image::types::{
    GenerationRequest, ImageData, InlineImage, Modality, ModelResponse, ResponsePart,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Public Generative Language API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Builder for GeminiProvider.
#[derive(Debug, Clone, Default)]
pub struct GeminiProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides the API base URL (e.g. a proxy).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the provider. Fails if no API key was given.
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                GenImgError::MissingCredential(format!(
                    "{API_KEY_ENV} environment variable not set"
                ))
            })?;

        Ok(GeminiProvider {
            client: reqwest::Client::new(),
            api_key,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

/// Gemini image generation provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    /// Builds a provider from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(ref key) = config.api_key {
            builder = builder.api_key(key);
        }
        builder.build()
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    async fn generate_impl(&self, model: &str, request: &GenerationRequest) -> Result<ModelResponse> {
        let start = Instant::now();
        let body = GeminiRequest::from_generation_request(request)?;

        tracing::debug!(
            model,
            reference_images = request.reference_images.len(),
            aspect_ratio = request.aspect_ratio.map(|a| a.as_str()),
            "sending Gemini generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let parsed = gemini_response.into_model_response()?;

        tracing::debug!(
            model,
            parts = parsed.parts.len(),
            finish_reason = parsed.finish_reason.as_deref(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Gemini response received"
        );
        Ok(parsed)
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> GenImgError {
    // Prefer the structured error message when the body is JSON.
    let message = serde_json::from_str::<GeminiErrorEnvelope>(text)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| text.to_string());
    let message = sanitize_error_message(&message);

    match status {
        401 | 403 => GenImgError::Auth(message),
        404 => GenImgError::InvalidRequest(format!(
            "model not found, verify the model name is correct: {message}"
        )),
        429 => {
            let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
            GenImgError::RateLimited { retry_after }
        }
        _ => {
            let lower = message.to_lowercase();
            if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited")
            {
                GenImgError::ContentBlocked(message)
            } else {
                GenImgError::Api { status, message }
            }
        }
    }
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<ModelResponse> {
        self.generate_impl(model, request).await
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<Modality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<GeminiImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: String,
}

impl GeminiRequest {
    fn from_generation_request(req: &GenerationRequest) -> Result<Self> {
        req.validate()?;

        let mut parts: Vec<GeminiRequestPart> = req
            .reference_images
            .iter()
            .map(|image| GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: image.format.mime_type().to_string(),
                    data: image.to_base64(),
                },
            })
            .collect();

        parts.push(GeminiRequestPart::Text {
            text: req.prompt.clone(),
        });

        Ok(Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: req.modalities.clone(),
                image_config: req.aspect_ratio.map(|ar| GeminiImageConfig {
                    aspect_ratio: ar.as_str().to_string(),
                }),
            },
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
    /// Intermediate reasoning output, not part of the answer.
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

impl GeminiResponse {
    /// Converts the first candidate into tagged parts.
    ///
    /// Safety blocks are recorded on the response rather than returned as
    /// errors so that any commentary the model sent survives.
    fn into_model_response(self) -> Result<ModelResponse> {
        // Blocked prompts come back as HTTP 200
        let prompt_block = self.prompt_feedback.and_then(|feedback| {
            let reason = feedback.block_reason?;
            Some(
                feedback
                    .block_reason_message
                    .unwrap_or_else(|| format!("prompt blocked: {reason}")),
            )
        });

        let Some(candidate) = self.candidates.into_iter().next() else {
            return match prompt_block {
                Some(msg) => Ok(ModelResponse {
                    blocked: Some(msg),
                    ..ModelResponse::default()
                }),
                None => Err(GenImgError::UnexpectedResponse(
                    "no candidates in Gemini response".into(),
                )),
            };
        };

        let safety_block = candidate
            .finish_reason
            .as_deref()
            .filter(|reason| is_safety_reason(reason))
            .map(|reason| format!("content blocked by Gemini safety filter: {reason}"));

        let parts = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|p| !p.thought)
            .filter_map(|p| match (p.inline_data, p.text) {
                (Some(inline), _) => Some(ResponsePart::InlineImage(InlineImage {
                    mime_type: inline.mime_type,
                    data: ImageData::Base64(inline.data),
                })),
                (None, Some(text)) => Some(ResponsePart::Text(text)),
                (None, None) => None,
            })
            .collect();

        Ok(ModelResponse {
            parts,
            finish_reason: candidate.finish_reason,
            blocked: prompt_block.or(safety_block),
        })
    }
}

fn is_safety_reason(reason: &str) -> bool {
    matches!(
        reason,
        "SAFETY"
            | "IMAGE_SAFETY"
            | "IMAGE_PROHIBITED_CONTENT"
            | "IMAGE_RECITATION"
            | "RECITATION"
            | "PROHIBITED_CONTENT"
            | "BLOCKLIST"
    )
}
