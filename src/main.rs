use clap::{value_parser, Arg, Command};
use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod mcp;
mod tools;
mod utils;

#[cfg(test)]
mod test_support;

use config::{CliOverrides, ServiceConfig};
use mcp::server::McpServer;
use mcp::transport::StdioTransport;
use utils::pipeline::ReportPipeline;

fn build_cli() -> Command {
    Command::new("mcp-labreport")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A Model Context Protocol server for lab report analysis")
        .long_about(
            "This MCP server provides the following tools:\n\
            - pdf-text: Download a PDF and extract its text\n\
            - image-ocr: Recognize text in an image via OCR.space\n\
            - lab-report-analysis: Explain lab report text with Gemini\n\
            - analyze-lab-report: Extract and explain a PDF or image report in one call",
        )
        .arg(
            Arg::new("gemini-api-key")
                .long("gemini-api-key")
                .value_name("KEY")
                .help("Gemini API key (falls back to GEMINI_API_KEY)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("ocr-space-api-key")
                .long("ocr-space-api-key")
                .value_name("KEY")
                .help("OCR.space API key (falls back to OCR_SPACE_API_KEY)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("gemini-model")
                .long("gemini-model")
                .value_name("MODEL")
                .help("Gemini model id (falls back to GEMINI_MODEL)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("fetch-timeout")
                .long("fetch-timeout")
                .value_name("SECONDS")
                .help("Timeout for PDF downloads, 0 disables it (falls back to FETCH_TIMEOUT_SECS)")
                .value_parser(value_parser!(u64))
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("max-document-bytes")
                .long("max-document-bytes")
                .value_name("BYTES")
                .help("Size limit for PDF downloads, 0 disables it (falls back to MAX_DOCUMENT_BYTES)")
                .value_parser(value_parser!(u64))
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("scratch-dir")
                .long("scratch-dir")
                .value_name("DIR")
                .help("Directory for temporary PDF files (falls back to SCRATCH_DIR)")
                .value_parser(value_parser!(PathBuf))
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Only log errors")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Logs go to stderr only; stdout is reserved for JSON-RPC.
fn init_tracing(quiet: bool) {
    let filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_flag("quiet"));

    let cli = CliOverrides {
        gemini_api_key: matches.get_one::<String>("gemini-api-key").cloned(),
        ocr_space_api_key: matches.get_one::<String>("ocr-space-api-key").cloned(),
        gemini_model: matches.get_one::<String>("gemini-model").cloned(),
        fetch_timeout_secs: matches.get_one::<u64>("fetch-timeout").copied(),
        max_document_bytes: matches.get_one::<u64>("max-document-bytes").copied(),
        scratch_dir: matches.get_one::<PathBuf>("scratch-dir").cloned(),
    };
    let config = ServiceConfig::resolve(cli, |key| env::var(key).ok());

    // Report configuration status without exposing secrets
    match &config.gemini.api_key {
        Some(_) => info!("Gemini analysis enabled (model: {})", config.gemini.model),
        None => warn!("GEMINI_API_KEY not found - analysis will return the fallback message"),
    }
    match &config.ocr.api_key {
        Some(_) => info!("OCR.space image extraction enabled"),
        None => warn!("OCR_SPACE_API_KEY not found - image extraction will return empty text"),
    }
    match config.fetch.timeout {
        Some(timeout) => info!("PDF download timeout: {}s", timeout.as_secs()),
        None => warn!("PDF download timeout disabled"),
    }
    match config.fetch.max_bytes {
        Some(limit) => info!("PDF download size limit: {} bytes", limit),
        None => warn!("PDF download size limit disabled"),
    }

    let client = match reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("mcp-labreport/", env!("CARGO_PKG_VERSION")))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            process::exit(1);
        }
    };

    info!("Starting MCP server...");

    let mut server = McpServer::new(ReportPipeline::new(client, config));
    let mut transport = StdioTransport::stdio();
    if let Err(e) = server.run(&mut transport).await {
        error!("Server stopped with error: {}", e);
        process::exit(1);
    }
}
