use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::report_analysis_tool::feedback_result;
use super::{parse_arguments, parse_http_url};
use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::utils::content_guard::DocumentKind;
use crate::utils::pipeline::ReportPipeline;

pub static ANALYZE_REPORT_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "analyze-lab-report".to_string(),
    description: "Extract the text of a lab report (PDF or image) from a URL and explain it".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "url": {
                "type": "string",
                "description": "The URL of the PDF or image"
            },
            "kind": {
                "type": "string",
                "enum": ["pdf", "image"],
                "description": "Document type; guessed from the URL extension when omitted (default: pdf)"
            }
        },
        "required": ["url"]
    }),
    annotations: Some(ToolAnnotations {
        title: Some("Analyze Lab Report".to_string()),
        read_only_hint: Some(true),
        open_world_hint: Some(true),
    }),
});

#[derive(Debug, Deserialize)]
struct AnalyzeReportParams {
    url: String,
    #[serde(default)]
    kind: Option<String>,
}

pub struct AnalyzeReportTool<'a> {
    pipeline: &'a ReportPipeline,
}

impl<'a> AnalyzeReportTool<'a> {
    pub fn new(pipeline: &'a ReportPipeline) -> Self {
        Self { pipeline }
    }

    pub async fn execute(&self, arguments: Option<serde_json::Value>) -> CallToolResult {
        let params = match parse_arguments::<AnalyzeReportParams>("analyze-lab-report", arguments) {
            Ok(params) => params,
            Err(result) => return result,
        };
        let url = match parse_http_url(&params.url) {
            Ok(url) => url,
            Err(result) => return result,
        };
        let hint = match params.kind.as_deref() {
            None => None,
            Some(raw) => match DocumentKind::from_hint(raw) {
                Some(kind) => Some(kind),
                None => {
                    return CallToolResult::error(format!(
                        "Invalid parameters: unknown document kind '{}'",
                        raw
                    ))
                }
            },
        };

        info!("Analyzing lab report at {} (kind hint: {:?})", url, hint);

        let feedback = self.pipeline.analyze_document(&url, hint).await;
        feedback_result(&feedback)
    }
}
