use futures::StreamExt;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use crate::config::FetchConfig;
use crate::utils::pdf::{extract_page_texts, is_pdf, join_pages};
use crate::utils::scratch::ScratchFile;

#[derive(Error, Debug)]
pub enum PdfFetchError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP Status: {0}")]
    Status(StatusCode),

    #[error("document exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("scratch file error: {0}")]
    Scratch(#[from] std::io::Error),

    #[error("PDF parse error: {0}")]
    Parse(String),
}

impl PdfFetchError {
    /// Stable code used in tool error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Request(_) | Self::Status(_) => "ERR_FETCH_HTTP",
            Self::TooLarge { .. } => "ERR_FETCH_TOO_LARGE",
            Self::Scratch(_) => "ERR_FETCH_SCRATCH",
            Self::Parse(_) => "ERR_FETCH_PDF_PARSE",
        }
    }

    /// Whether retrying the same URL later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) | Self::Scratch(_) => true,
            Self::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::TooLarge { .. } | Self::Parse(_) => false,
        }
    }
}

/// Downloads PDFs to a scratch file and extracts their text.
pub struct PdfFetcher {
    client: Client,
    config: FetchConfig,
}

impl PdfFetcher {
    pub fn new(client: Client, config: FetchConfig) -> Self {
        Self { client, config }
    }

    /// Fetches `url` and returns the text of all pages joined by single
    /// spaces. `Ok("")` means the document carried no text layer.
    pub async fn fetch_text(&self, url: &str) -> Result<String, PdfFetchError> {
        info!(target: "pdf_fetcher", url = %url, "Starting PDF download");
        let started = std::time::Instant::now();

        let mut request = self.client.get(url);
        if let Some(timeout) = self.config.timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(target: "pdf_fetcher", url = %url, status = status.as_u16(), "HTTP non-success status");
            return Err(PdfFetchError::Status(status));
        }

        let limit = self.config.max_bytes;
        let declared = response.content_length();
        if let Some(limit) = limit.filter(|&l| declared.is_some_and(|len| len > l)) {
            warn!(target: "pdf_fetcher", url = %url, limit = limit, "Declared size over limit; refusing");
            return Err(PdfFetchError::TooLarge { limit });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|ct| ct.to_str().ok())
            .map(|s| s.to_string());

        // Dropped last: the file is removed on every exit path below.
        let scratch = ScratchFile::new_in(&self.config.scratch_dir, "pdf");
        let mut file = tokio::fs::File::create(scratch.path()).await?;
        let mut written: u64 = 0;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            if written == 0 && !is_pdf(content_type.as_deref(), &chunk) {
                warn!(target: "pdf_fetcher", url = %url, ct = ?content_type, "Body does not look like a PDF; parsing anyway");
            }
            written += chunk.len() as u64;
            if let Some(limit) = limit.filter(|&l| written > l) {
                warn!(target: "pdf_fetcher", url = %url, limit = limit, "Body over limit; aborting download");
                return Err(PdfFetchError::TooLarge { limit });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        info!(target: "pdf_fetcher", url = %url, size = written, "Download completed; starting PDF text extraction");

        let path = scratch.path().to_path_buf();
        let pages = tokio::task::spawn_blocking(move || extract_page_texts(&path))
            .await
            .map_err(|e| PdfFetchError::Parse(format!("parser task failed: {}", e)))?
            .map_err(|e| PdfFetchError::Parse(format!("{:#}", e)))?;

        let text = join_pages(&pages);
        info!(
            target: "pdf_fetcher",
            url = %url,
            pages = pages.len(),
            chars = text.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "PDF extraction succeeded"
        );

        Ok(text)
    }

    /// Like [`PdfFetcher::fetch_text`], but logs any failure and returns an
    /// empty string instead.
    pub async fn fetch_text_or_empty(&self, url: &str) -> String {
        match self.fetch_text(url).await {
            Ok(text) => text,
            Err(e) => {
                error!(target: "pdf_fetcher", url = %url, code = e.code(), "PDF fetch failed: {}", e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pdf_with_pages, unreachable_url, MockResponse, MockServer};
    use std::path::Path;

    fn fetcher_in(dir: &Path) -> PdfFetcher {
        let config = FetchConfig {
            scratch_dir: dir.to_path_buf(),
            ..FetchConfig::default()
        };
        PdfFetcher::new(Client::new(), config)
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn extracts_text_from_served_pdf_and_removes_scratch() {
        let server = MockServer::start(MockResponse::bytes(
            200,
            "application/pdf",
            pdf_with_pages(&["Hemoglobin 13.5", "WBC 6.1"]),
        ));
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_in(dir.path());

        let text = fetcher.fetch_text(&server.url("/cbc.pdf")).await.unwrap();

        assert_eq!(text, "Hemoglobin 13.5 WBC 6.1");
        assert_eq!(entries(dir.path()), 0);
        assert_eq!(server.requests()[0].target, "/cbc.pdf");
    }

    #[tokio::test]
    async fn unreachable_url_yields_empty_text_and_no_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_in(dir.path());

        let text = fetcher.fetch_text_or_empty(&unreachable_url("/report.pdf")).await;

        assert_eq!(text, "");
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn unreachable_url_is_a_transient_request_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_in(dir.path());

        let err = fetcher
            .fetch_text(&unreachable_url("/report.pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, PdfFetchError::Request(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn http_error_status_is_reported_without_parsing() {
        let server = MockServer::start(MockResponse::bytes(404, "text/plain", "missing"));
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_in(dir.path());

        let err = fetcher.fetch_text(&server.url("/lab.pdf")).await.unwrap_err();

        assert!(matches!(err, PdfFetchError::Status(StatusCode::NOT_FOUND)));
        assert!(!err.is_transient());
        assert_eq!(err.code(), "ERR_FETCH_HTTP");
        assert_eq!(entries(dir.path()), 0);
        assert_eq!(server.requests()[0].method, "GET");
        assert_eq!(server.requests()[0].target, "/lab.pdf");
    }

    #[tokio::test]
    async fn unparseable_body_is_a_parse_error_and_scratch_is_removed() {
        let server = MockServer::start(MockResponse::bytes(
            200,
            "application/pdf",
            "this is not a PDF document at all",
        ));
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_in(dir.path());

        let err = fetcher.fetch_text(&server.url("/broken.pdf")).await.unwrap_err();

        assert!(matches!(err, PdfFetchError::Parse(_)), "got {:?}", err);
        assert_eq!(entries(dir.path()), 0);
        assert_eq!(fetcher.fetch_text_or_empty(&server.url("/broken.pdf")).await, "");
    }

    #[tokio::test]
    async fn oversized_body_is_refused() {
        let server = MockServer::start(MockResponse::bytes(200, "application/pdf", vec![b'x'; 256]));
        let dir = tempfile::tempdir().unwrap();
        let config = FetchConfig {
            scratch_dir: dir.path().to_path_buf(),
            timeout: None,
            max_bytes: Some(64),
        };
        let fetcher = PdfFetcher::new(Client::new(), config);

        let err = fetcher.fetch_text(&server.url("/big.pdf")).await.unwrap_err();

        assert!(matches!(err, PdfFetchError::TooLarge { limit: 64 }));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn size_limit_can_be_disabled() {
        let server = MockServer::start(MockResponse::bytes(200, "application/pdf", vec![b'x'; 256]));
        let dir = tempfile::tempdir().unwrap();
        let config = FetchConfig {
            scratch_dir: dir.path().to_path_buf(),
            timeout: None,
            max_bytes: None,
        };
        let fetcher = PdfFetcher::new(Client::new(), config);

        let err = fetcher.fetch_text(&server.url("/big.pdf")).await.unwrap_err();

        assert!(matches!(err, PdfFetchError::Parse(_)), "got {:?}", err);
        assert_eq!(entries(dir.path()), 0);
    }
}
