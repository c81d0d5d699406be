//! Gemini provider for leaf diagnosis and plant-care chat
//!
//! Uses Gemini's generateContent API with a JSON response schema so the
//! diagnosis comes back as structured output.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{Diagnosis, DiagnosisProvider, ImagePayload, ProviderError};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

const DIAGNOSIS_PROMPT: &str = "Analyze this plant leaf image.
1. Identify the plant species.
2. Detect if there is any disease.
3. If diseased, provide the disease name, a brief description, remedies, and recommended pesticides.
4. If healthy, state it clearly.
Return the result in JSON format.";

const ASSISTANT_INSTRUCTION: &str =
    "You are a helpful plant care assistant. Provide expert advice on gardening, farming, and plant health.";

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

pub struct GeminiProvider {
    client: Client,
    settings: GeminiSettings,
}

impl GeminiProvider {
    pub fn new(settings: GeminiSettings) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    async fn generate(&self, request: &GeminiRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.settings.api_key.as_str())])
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API error: {} - {}", status, body);
            return Err(ProviderError::Api { status, body });
        }

        let api_response: GeminiResponse = response.json().await?;
        extract_text(api_response)
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Serialize)]
struct GeminiInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: Value,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
}

fn diagnosis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "plantName": { "type": "STRING" },
            "diseaseName": { "type": "STRING" },
            "confidence": { "type": "NUMBER" },
            "description": { "type": "STRING" },
            "remedies": { "type": "ARRAY", "items": { "type": "STRING" } },
            "pesticides": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["plantName", "diseaseName", "confidence", "description", "remedies", "pesticides"]
    })
}

fn diagnosis_request(image: &ImagePayload) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![
                GeminiPart::Text { text: DIAGNOSIS_PROMPT.to_string() },
                GeminiPart::InlineData {
                    inline_data: GeminiInlineData {
                        mime_type: image.mime_type.clone(),
                        data: image.data.clone(),
                    },
                },
            ],
        }],
        system_instruction: None,
        generation_config: Some(GeminiGenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: diagnosis_schema(),
        }),
    }
}

fn chat_request(message: &str) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart::Text { text: message.to_string() }],
        }],
        system_instruction: Some(GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text { text: ASSISTANT_INSTRUCTION.to_string() }],
        }),
        generation_config: None,
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GeminiResponse) -> Result<String, ProviderError> {
    if let Some(error) = response.error {
        return Err(ProviderError::Decode(format!("Gemini error: {}", error.message)));
    }

    let text: String = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ProviderError::Decode("response contained no text".to_string()));
    }
    Ok(text)
}

/// Parse the model's JSON text, tolerating a markdown code fence around it
fn parse_diagnosis(text: &str) -> Result<Diagnosis, ProviderError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim()).map_err(|e| ProviderError::Decode(e.to_string()))
}

#[async_trait]
impl DiagnosisProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn diagnose(&self, image: &ImagePayload) -> Result<Diagnosis, ProviderError> {
        debug!("Requesting diagnosis ({}, {} bytes base64)", image.mime_type, image.data.len());
        let text = self.generate(&diagnosis_request(image)).await?;
        parse_diagnosis(&text)
    }

    async fn chat(&self, message: &str) -> Result<String, ProviderError> {
        self.generate(&chat_request(message)).await
    }
}
