use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::GeminiConfig;

const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingCredential,

    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: HTTP Status {status}")]
    Api { status: StatusCode },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GeminiError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Api { status } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::MissingCredential | Self::Serialization(_) => false,
        }
    }
}

/// Sampling parameters sent as `generationConfig`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            top_k: 32,
            top_p: 0.95,
            max_output_tokens: 512,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// `candidates[0].content.parts[0].text`, if present and not blank.
    fn into_first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.trim().is_empty())
    }
}

// The request URL carries the API key as a query parameter.
fn strip_url(e: reqwest::Error) -> GeminiError {
    GeminiError::Request(e.without_url())
}

/// Client for the `generateContent` method of the generative-language API.
pub struct GeminiService {
    client: Client,
    config: GeminiConfig,
    generation: GenerationConfig,
}

impl GeminiService {
    pub fn new(client: Client, config: GeminiConfig) -> Self {
        Self {
            client,
            config,
            generation: GenerationConfig::default(),
        }
    }

    /// Sends a single-turn prompt. `Ok(None)` means the API answered but
    /// produced no candidate text.
    pub async fn generate_content(&self, prompt: &str) -> Result<Option<String>, GeminiError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(GeminiError::MissingCredential)?;

        let request_body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: &self.generation,
        };

        info!(
            target: "gemini",
            model = %self.config.model,
            prompt_chars = prompt.chars().count(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.config.generate_content_url())
            .query(&[("key", api_key)])
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request_body)
            .timeout(GENERATION_TIMEOUT)
            .send()
            .await
            .map_err(strip_url)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(target: "gemini", "Gemini API error: Status {} - {}", status, body);
            return Err(GeminiError::Api { status });
        }

        let response_text = response.text().await.map_err(strip_url)?;
        debug!(target: "gemini", "Received response from Gemini API: {}", response_text);

        let parsed = serde_json::from_str::<GenerateContentResponse>(&response_text)?;
        Ok(parsed.into_first_text())
    }
}
