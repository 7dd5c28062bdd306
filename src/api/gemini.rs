//! A client for Gemini's `generateContent` endpoint.

use crate::api::{ExtractionInput, Extractor};
use crate::error::{ErrorType, IntoResult, Res};
use crate::model::extraction_prompt;
use crate::Result;
use anyhow::{bail, Context};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// The model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

pub struct GeminiClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
    prompt: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http,
            prompt: extraction_prompt(),
        }
    }

    fn request(&self, input: ExtractionInput<'_>) -> GenerateRequest {
        let parts = match input {
            ExtractionInput::Text(text) => vec![Part {
                text: Some(format!("{}\n\nText: {text}", self.prompt)),
                ..Part::default()
            }],
            ExtractionInput::Image { bytes, mime_type } => vec![
                Part {
                    text: Some(self.prompt.clone()),
                    ..Part::default()
                },
                Part {
                    inline_data: Some(Blob {
                        mime_type: mime_type.to_string(),
                        data: base64::engine::general_purpose::STANDARD.encode(bytes),
                    }),
                    ..Part::default()
                },
            ],
        };
        GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: 0.1,
            },
        }
    }

    async fn generate(&self, request: &GenerateRequest) -> Res<String> {
        debug!("Sending request to Gemini model {}", self.model);
        let response = self
            .http
            .post(format!("{GEMINI_API_URL}/{}:generateContent", self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .context("Failed to send the request to Gemini")?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
            bail!("Gemini API error ({status}): {message}");
        }

        let body: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse the Gemini response")?;
        let text = reply_text(body);
        if text.trim().is_empty() {
            bail!("Gemini returned an empty response");
        }
        debug!("Received {} characters from Gemini", text.len());
        Ok(text)
    }
}

/// Joins the text parts of the first candidate.
fn reply_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl Extractor for GeminiClient {
    async fn extract(&self, input: ExtractionInput<'_>) -> Result<String> {
        let request = self.request(input);
        self.generate(&request).await.pub_result(ErrorType::Upstream)
    }
}
