use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::OcrConfig;

const OCR_TIMEOUT: Duration = Duration::from_secs(20);
const OCR_LANGUAGE: &str = "eng";

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR_SPACE_API_KEY is not configured")]
    MissingCredential,

    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OcrError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "ERR_OCR_NOT_CONFIGURED",
            Self::Request(_) => "ERR_OCR_HTTP",
            Self::Api(_) => "ERR_OCR_API",
            Self::Serialization(_) => "ERR_OCR_RESPONSE",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResponse {
    #[serde(default)]
    parsed_results: Option<Vec<ParsedResult>>,
    #[serde(default)]
    is_errored_on_processing: bool,
    // A string or an array of strings depending on the failure.
    #[serde(default)]
    error_message: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: Option<String>,
}

fn describe_error(message: Option<serde_json::Value>) -> String {
    match message {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => other.to_string(),
        None => "OCR processing failed".to_string(),
    }
}

/// Client for the OCR.space `parse/image` endpoint.
pub struct OcrSpaceService {
    client: Client,
    config: OcrConfig,
}

impl OcrSpaceService {
    pub fn new(client: Client, config: OcrConfig) -> Self {
        Self { client, config }
    }

    /// Returns the trimmed text of the first parsed result, or `""` when the
    /// service recognised nothing.
    pub async fn extract_text(&self, image_url: &str) -> Result<String, OcrError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(OcrError::MissingCredential)?;

        info!(target: "ocr_space", url = %image_url, "Submitting image to OCR.space");

        let form = [
            ("url", image_url),
            ("language", OCR_LANGUAGE),
            ("isOverlayRequired", "false"),
        ];

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("apikey", api_key)
            .form(&form)
            .timeout(OCR_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(target: "ocr_space", "OCR.space API error: Status {}", status);
            return Err(OcrError::Api(format!("HTTP Status: {}", status)));
        }

        let response_text = response.text().await?;
        debug!(target: "ocr_space", "Received response from OCR.space: {}", response_text);

        let parsed = serde_json::from_str::<OcrSpaceResponse>(&response_text)?;
        if parsed.is_errored_on_processing {
            let message = describe_error(parsed.error_message);
            warn!(target: "ocr_space", url = %image_url, "OCR.space reported a processing error: {}", message);
            return Err(OcrError::Api(message));
        }

        let text = parsed
            .parsed_results
            .and_then(|results| results.into_iter().next())
            .and_then(|first| first.parsed_text)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        info!(target: "ocr_space", url = %image_url, chars = text.chars().count(), "OCR completed");
        Ok(text)
    }

    /// Like [`OcrSpaceService::extract_text`], but logs any failure and
    /// returns an empty string instead.
    pub async fn extract_text_or_empty(&self, image_url: &str) -> String {
        match self.extract_text(image_url).await {
            Ok(text) => text,
            Err(e) => {
                error!(target: "ocr_space", url = %image_url, code = e.code(), "OCR failed: {}", e);
                String::new()
            }
        }
    }
}
