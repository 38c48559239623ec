use serde::de::DeserializeOwned;
use tracing::error;

use crate::mcp::types::CallToolResult;

pub mod analyze_report_tool;
pub mod image_ocr_tool;
pub mod pdf_text_tool;
pub mod report_analysis_tool;

/// Decodes tool arguments, turning a failure into the tool error to return.
pub(crate) fn parse_arguments<T: DeserializeOwned>(
    tool: &str,
    arguments: Option<serde_json::Value>,
) -> Result<T, CallToolResult> {
    match arguments {
        Some(args) => serde_json::from_value::<T>(args).map_err(|e| {
            error!("Invalid {} parameters: {}", tool, e);
            CallToolResult::error(format!("Invalid parameters: {}", e))
        }),
        None => Err(CallToolResult::error("Missing required parameters")),
    }
}

/// Accepts only absolute http(s) URLs.
pub(crate) fn parse_http_url(raw: &str) -> Result<url::Url, CallToolResult> {
    let parsed =
        url::Url::parse(raw).map_err(|e| CallToolResult::error(format!("Invalid URL: {}", e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(CallToolResult::error(format!(
            "Invalid URL: unsupported scheme '{}'",
            other
        ))),
    }
}
