use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{parse_arguments, parse_http_url};
use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::utils::content_guard::build_error_payload;
use crate::utils::pdf_fetcher::PdfFetcher;

pub const NO_TEXT_IN_DOCUMENT: &str = "No readable text found in document.";

pub static PDF_TEXT_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "pdf-text".to_string(),
    description: "Download a PDF document by URL and return its plain text, pages joined by spaces"
        .to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "url": {
                "type": "string",
                "description": "The URL of the PDF document"
            }
        },
        "required": ["url"]
    }),
    annotations: Some(ToolAnnotations {
        title: Some("PDF Text Extraction".to_string()),
        read_only_hint: Some(true),
        open_world_hint: Some(true),
    }),
});

#[derive(Debug, Deserialize)]
struct PdfTextParams {
    url: String,
}

pub struct PdfTextTool<'a> {
    fetcher: &'a PdfFetcher,
}

impl<'a> PdfTextTool<'a> {
    pub fn new(fetcher: &'a PdfFetcher) -> Self {
        Self { fetcher }
    }

    pub async fn execute(&self, arguments: Option<serde_json::Value>) -> CallToolResult {
        let params = match parse_arguments::<PdfTextParams>("pdf-text", arguments) {
            Ok(params) => params,
            Err(result) => return result,
        };
        let url = match parse_http_url(&params.url) {
            Ok(url) => url,
            Err(result) => return result,
        };

        info!("Extracting PDF text from: {}", url);

        match self.fetcher.fetch_text(url.as_str()).await {
            Ok(text) if text.is_empty() => CallToolResult::success(NO_TEXT_IN_DOCUMENT),
            Ok(text) => CallToolResult::success(text),
            Err(e) => {
                warn!("PDF text extraction failed for {}: {}", url, e);
                CallToolResult::error(build_error_payload(
                    e.code(),
                    "Failed to extract text from the PDF document",
                    json!({
                        "url": url.as_str(),
                        "error": e.to_string(),
                        "retryable": e.is_transient(),
                    }),
                ))
            }
        }
    }
}
