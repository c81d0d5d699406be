//! Diagnosis Provider integration
//!
//! The provider classifies a leaf photo and answers plant-care questions.
//! Its reasoning is opaque; this module only shapes the request and
//! decodes the typed reply.

pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::history::HealthStatus;

pub use gemini::GeminiProvider;

/// Structured diagnosis as returned by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub plant_name: String,
    pub disease_name: String,
    pub confidence: f64,
    pub description: String,
    pub remedies: Vec<String>,
    pub pesticides: Vec<String>,
}

impl Diagnosis {
    pub fn health_status(&self) -> HealthStatus {
        HealthStatus::classify(Some(&self.disease_name))
    }
}

/// An image submitted for diagnosis, split out of its data URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    /// Base64 body without the `data:...;base64,` header
    pub data: String,
}

impl ImagePayload {
    const DEFAULT_MIME: &'static str = "image/jpeg";

    /// Accepts `data:<mime>;base64,<body>` or bare base64
    pub fn parse(raw: &str) -> Result<Self, ProviderError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ProviderError::InvalidImage("image is empty".to_string()));
        }

        let Some(rest) = raw.strip_prefix("data:") else {
            return Ok(Self {
                mime_type: Self::DEFAULT_MIME.to_string(),
                data: raw.to_string(),
            });
        };

        let (header, body) = rest
            .split_once(',')
            .ok_or_else(|| ProviderError::InvalidImage("data URL has no payload".to_string()))?;
        if body.is_empty() {
            return Err(ProviderError::InvalidImage("data URL has no payload".to_string()));
        }

        let mime = header.split(';').next().unwrap_or_default();
        let mime_type = if mime.is_empty() { Self::DEFAULT_MIME } else { mime };

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: body.to_string(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Provider API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed provider response: {0}")]
    Decode(String),
}

/// Seam between the HTTP layer and whichever model answers
#[async_trait]
pub trait DiagnosisProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn diagnose(&self, image: &ImagePayload) -> Result<Diagnosis, ProviderError>;

    async fn chat(&self, message: &str) -> Result<String, ProviderError>;
}
