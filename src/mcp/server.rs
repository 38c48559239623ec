use anyhow::Result;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use super::transport::LineTransport;
use super::types::*;
use crate::tools::{
    analyze_report_tool::{AnalyzeReportTool, ANALYZE_REPORT_TOOL_DEFINITION},
    image_ocr_tool::{ImageOcrTool, IMAGE_OCR_TOOL_DEFINITION},
    pdf_text_tool::{PdfTextTool, PDF_TEXT_TOOL_DEFINITION},
    report_analysis_tool::{ReportAnalysisTool, REPORT_ANALYSIS_TOOL_DEFINITION},
};
use crate::utils::pipeline::ReportPipeline;

pub struct McpServer {
    pipeline: ReportPipeline,
    initialized: bool,
}

impl McpServer {
    pub fn new(pipeline: ReportPipeline) -> Self {
        Self {
            pipeline,
            initialized: false,
        }
    }

    /// Serves requests one at a time until the peer closes the stream.
    pub async fn run<R, W>(&mut self, transport: &mut LineTransport<R, W>) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("MCP server started and listening");

        while let Some(message) = transport.read_message().await? {
            match message {
                McpMessage::Request(request) => {
                    let response = self.handle_request(request).await;
                    transport.write_response(response).await?;
                }
                McpMessage::Notification(notification) => {
                    self.handle_notification(notification);
                }
                McpMessage::Malformed(reason) => {
                    let response =
                        McpResponse::failure(serde_json::Value::Null, PARSE_ERROR, reason);
                    transport.write_response(response).await?;
                }
            }
        }

        info!("Client disconnected");
        Ok(())
    }

    async fn handle_request(&mut self, request: McpRequest) -> McpResponse {
        let id = Self::ensure_valid_id(request.id);

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "tools/list" => McpResponse::from_serializable(id, &Self::list_tools()),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "ping" => McpResponse::success(id, serde_json::json!({})),
            _ => McpResponse::failure(id, METHOD_NOT_FOUND, "Method not found"),
        }
    }

    fn handle_notification(&mut self, notification: McpNotification) {
        debug!("Received notification: {}", notification.method);

        match notification.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialization completed");
                self.initialized = true;
            }
            "notifications/cancelled" => {
                debug!("Request cancelled notification received");
            }
            _ => {
                warn!("Unknown notification method: {}", notification.method);
            }
        }
    }

    fn ensure_valid_id(id: Option<serde_json::Value>) -> serde_json::Value {
        match id {
            Some(serde_json::Value::Null) | None => serde_json::Value::String("0".to_string()),
            Some(value) => value,
        }
    }

    fn handle_initialize(
        &mut self,
        id: serde_json::Value,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let Some(params) = params else {
            return McpResponse::failure(id, INVALID_PARAMS, "Missing params");
        };

        match serde_json::from_value::<InitializeParams>(params) {
            Ok(init_params) => {
                info!(
                    "Initializing session for client {} {}",
                    init_params.client_info.name, init_params.client_info.version
                );
                let result = InitializeResult {
                    protocol_version: PROTOCOL_VERSION.to_string(),
                    server_info: ServerInfo {
                        name: "Lab Report Analysis MCP".to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                        description: Some(env!("CARGO_PKG_DESCRIPTION").to_string()),
                    },
                    capabilities: ServerCapabilities {
                        tools: Some(ToolsCapability {
                            list_changed: Some(false),
                        }),
                        logging: Some(serde_json::json!({})),
                    },
                };
                McpResponse::from_serializable(id, &result)
            }
            Err(e) => McpResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
        }
    }

    // Tools are always listed; unconfigured credentials surface as tool-level
    // fallbacks rather than missing tools.
    fn list_tools() -> ListToolsResult {
        ListToolsResult {
            tools: vec![
                PDF_TEXT_TOOL_DEFINITION.clone(),
                IMAGE_OCR_TOOL_DEFINITION.clone(),
                REPORT_ANALYSIS_TOOL_DEFINITION.clone(),
                ANALYZE_REPORT_TOOL_DEFINITION.clone(),
            ],
        }
    }

    async fn handle_call_tool(
        &self,
        id: serde_json::Value,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let Some(params) = params else {
            return McpResponse::failure(id, INVALID_PARAMS, "Missing params");
        };

        match serde_json::from_value::<CallToolParams>(params) {
            Ok(call_params) => {
                let name = call_params.name.clone();
                let result = self.execute_tool(call_params).await;
                if result.is_error() {
                    warn!(
                        "Tool {} returned an error: {}",
                        name,
                        result.text().lines().next().unwrap_or_default()
                    );
                }
                McpResponse::from_serializable(id, &result)
            }
            Err(e) => McpResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
        }
    }

    async fn execute_tool(&self, params: CallToolParams) -> CallToolResult {
        if !self.initialized {
            debug!("Tool call before initialized notification: {}", params.name);
        }

        match params.name.as_str() {
            "pdf-text" => {
                PdfTextTool::new(&self.pipeline.fetcher)
                    .execute(params.arguments)
                    .await
            }
            "image-ocr" => ImageOcrTool::new(&self.pipeline.ocr).execute(params.arguments).await,
            "lab-report-analysis" => {
                ReportAnalysisTool::new(&self.pipeline.analyzer)
                    .execute(params.arguments)
                    .await
            }
            "analyze-lab-report" => {
                AnalyzeReportTool::new(&self.pipeline)
                    .execute(params.arguments)
                    .await
            }
            _ => CallToolResult::error(format!("Tool not found: {}", params.name)),
        }
    }
}
