use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::parse_arguments;
use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::utils::lab_report::{Feedback, LabReportAnalyzer};

pub static REPORT_ANALYSIS_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "lab-report-analysis".to_string(),
    description: "Explain the text of a lab report: summary, implications, recommendations and a normal/abnormal verdict".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "text": {
                "type": "string",
                "description": "Text extracted from the lab report (only the first 3000 characters are used)"
            }
        },
        "required": ["text"]
    }),
    annotations: Some(ToolAnnotations {
        title: Some("Lab Report Analysis".to_string()),
        read_only_hint: Some(true),
        open_world_hint: Some(true),
    }),
});

#[derive(Debug, Deserialize)]
struct ReportAnalysisParams {
    #[serde(default)]
    text: Option<String>,
}

/// Renders the feedback record as the tool's JSON text body.
pub fn feedback_result(feedback: &Feedback) -> CallToolResult {
    CallToolResult::success(json!({ "feedback": feedback.feedback }).to_string())
}

pub struct ReportAnalysisTool<'a> {
    analyzer: &'a LabReportAnalyzer,
}

impl<'a> ReportAnalysisTool<'a> {
    pub fn new(analyzer: &'a LabReportAnalyzer) -> Self {
        Self { analyzer }
    }

    pub async fn execute(&self, arguments: Option<serde_json::Value>) -> CallToolResult {
        let params = match parse_arguments::<ReportAnalysisParams>("lab-report-analysis", arguments)
        {
            Ok(params) => params,
            Err(result) => return result,
        };
        let text = params.text.unwrap_or_default();

        info!("Analyzing lab report text ({} characters)", text.chars().count());

        let feedback = self.analyzer.analyze(&text).await;
        feedback_result(&feedback)
    }
}
