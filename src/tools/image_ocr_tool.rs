use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{parse_arguments, parse_http_url};
use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::utils::content_guard::build_error_payload;
use crate::utils::ocr_space::OcrSpaceService;

pub static IMAGE_OCR_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "image-ocr".to_string(),
    description: "Recognize English text in an image (scan or photo of a document) available at a URL"
        .to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "url": {
                "type": "string",
                "description": "The public URL of the image"
            }
        },
        "required": ["url"]
    }),
    annotations: Some(ToolAnnotations {
        title: Some("Image OCR".to_string()),
        read_only_hint: Some(true),
        open_world_hint: Some(true),
    }),
});

#[derive(Debug, Deserialize)]
struct ImageOcrParams {
    url: String,
}

pub struct ImageOcrTool<'a> {
    ocr: &'a OcrSpaceService,
}

impl<'a> ImageOcrTool<'a> {
    pub fn new(ocr: &'a OcrSpaceService) -> Self {
        Self { ocr }
    }

    pub async fn execute(&self, arguments: Option<serde_json::Value>) -> CallToolResult {
        let params = match parse_arguments::<ImageOcrParams>("image-ocr", arguments) {
            Ok(params) => params,
            Err(result) => return result,
        };
        let url = match parse_http_url(&params.url) {
            Ok(url) => url,
            Err(result) => return result,
        };

        info!("Running OCR on image: {}", url);

        match self.ocr.extract_text(url.as_str()).await {
            Ok(text) if text.is_empty() => CallToolResult::success("No text recognized in image."),
            Ok(text) => CallToolResult::success(text),
            Err(e) => {
                warn!("OCR failed for {}: {}", url, e);
                CallToolResult::error(build_error_payload(
                    e.code(),
                    "Failed to recognize text in the image",
                    json!({
                        "url": url.as_str(),
                        "error": e.to_string(),
                    }),
                ))
            }
        }
    }
}
