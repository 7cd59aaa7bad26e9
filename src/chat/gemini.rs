//! Gemini `generateContent` client.

use super::ChatClient;
use crate::error::AvatarError;
use async_trait::async_trait;
use serde::Deserialize;

const SERVICE: &str = "Gemini";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Defaults to `https://generativelanguage.googleapis.com`
    pub base_url: String,
    pub model: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-pro".to_string(),
        }
    }

    /// Set the base URL (useful for testing with mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Build a single-turn request body.
pub fn build_request(text: &str) -> serde_json::Value {
    serde_json::json!({
        "contents": [{
            "role": "user",
            "parts": [{"text": text}],
        }]
    })
}

/// Concatenated text of the first candidate; `None` when it is empty.
fn reply_text(response: GenerateResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

pub struct GeminiChat {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiChat {
    pub fn new(config: GeminiConfig) -> Self {
        if config.api_key.trim().is_empty() {
            log::error!("Missing Gemini API key; set GEMINI_API_KEY");
        }
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChatClient for GeminiChat {
    async fn send_message(&self, text: &str) -> Result<String, AvatarError> {
        if self.config.api_key.trim().is_empty() {
            return Err(AvatarError::Config("missing Gemini API key; set GEMINI_API_KEY".into()));
        }
        let url = self.config.endpoint();
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&build_request(text))
            .send()
            .await
            .map_err(|e| AvatarError::collaborator(SERVICE, e.without_url()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            log::warn!("Gemini returned HTTP {status}: {body}");
            return Err(AvatarError::Http { status, url }.into_collaborator(SERVICE));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AvatarError::collaborator(SERVICE, e.without_url()))?;
        reply_text(parsed).ok_or_else(|| AvatarError::collaborator(SERVICE, "No response from Gemini"))
    }
}
