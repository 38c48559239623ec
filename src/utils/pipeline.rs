use reqwest::Client;
use tracing::info;

use crate::config::ServiceConfig;
use crate::utils::content_guard::DocumentKind;
use crate::utils::gemini::GeminiService;
use crate::utils::lab_report::{Feedback, LabReportAnalyzer};
use crate::utils::ocr_space::OcrSpaceService;
use crate::utils::pdf_fetcher::PdfFetcher;

/// The three report services, sharing one HTTP client.
pub struct ReportPipeline {
    pub fetcher: PdfFetcher,
    pub ocr: OcrSpaceService,
    pub analyzer: LabReportAnalyzer,
}

impl ReportPipeline {
    pub fn new(client: Client, config: ServiceConfig) -> Self {
        Self {
            fetcher: PdfFetcher::new(client.clone(), config.fetch),
            ocr: OcrSpaceService::new(client.clone(), config.ocr),
            analyzer: LabReportAnalyzer::new(GeminiService::new(client, config.gemini)),
        }
    }

    /// Explicit hint first, then the URL extension; PDF when neither decides.
    pub fn resolve_kind(url: &url::Url, hint: Option<DocumentKind>) -> DocumentKind {
        hint.or_else(|| DocumentKind::from_url(url))
            .unwrap_or(DocumentKind::Pdf)
    }

    pub async fn extract_text(&self, url: &str, kind: DocumentKind) -> String {
        match kind {
            DocumentKind::Pdf => self.fetcher.fetch_text_or_empty(url).await,
            DocumentKind::Image => self.ocr.extract_text_or_empty(url).await,
        }
    }

    /// Runs the matching extractor, then the analyzer on its output.
    pub async fn analyze_document(&self, url: &url::Url, hint: Option<DocumentKind>) -> Feedback {
        let kind = Self::resolve_kind(url, hint);
        info!(target: "pipeline", url = %url, kind = %kind, "Analyzing document");

        let text = self.extract_text(url.as_str(), kind).await;
        self.analyzer.analyze(&text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FetchConfig, GeminiConfig, OcrConfig};
    use crate::test_support::{pdf_with_pages, MockResponse, MockServer};
    use crate::utils::lab_report::NO_READABLE_TEXT;
    use serde_json::json;

    fn parse(url: &str) -> url::Url {
        url::Url::parse(url).unwrap()
    }

    #[test]
    fn hint_overrides_extension() {
        let url = parse("https://files.example/scan.pdf");
        assert_eq!(
            ReportPipeline::resolve_kind(&url, Some(DocumentKind::Image)),
            DocumentKind::Image
        );
        assert_eq!(ReportPipeline::resolve_kind(&url, None), DocumentKind::Pdf);
        assert_eq!(
            ReportPipeline::resolve_kind(&parse("https://files.example/scan.png"), None),
            DocumentKind::Image
        );
        assert_eq!(
            ReportPipeline::resolve_kind(&parse("https://files.example/get?id=7"), None),
            DocumentKind::Pdf
        );
    }

    #[tokio::test]
    async fn image_report_goes_through_ocr_then_analysis() {
        let ocr = MockServer::start(MockResponse::json(
            200,
            json!({ "ParsedResults": [{ "ParsedText": "TSH 6.8 mIU/L (high), Free T4 0.7 ng/dL (low)" }] }),
        ));
        let gemini = MockServer::start(MockResponse::json(
            200,
            json!({ "candidates": [{ "content": { "parts": [{ "text": "Verdict: Abnormal" }] } }] }),
        ));
        let dir = tempfile::tempdir().unwrap();

        let mut gemini_config = GeminiConfig::new(Some("g-key".to_string()));
        gemini_config.base_url = gemini.base_url().to_string();
        let config = ServiceConfig {
            gemini: gemini_config,
            ocr: OcrConfig {
                api_key: Some("o-key".to_string()),
                endpoint: ocr.url("/parse/image"),
            },
            fetch: FetchConfig {
                scratch_dir: dir.path().to_path_buf(),
                ..FetchConfig::default()
            },
        };
        let pipeline = ReportPipeline::new(Client::new(), config);

        let feedback = pipeline
            .analyze_document(&parse("https://img.example/thyroid.jpg"), None)
            .await;

        assert_eq!(feedback.feedback, "Verdict: Abnormal");
        assert_eq!(ocr.requests().len(), 1);
        let body = gemini.requests()[0].body_json();
        assert!(body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("TSH 6.8 mIU/L"));
    }

    #[tokio::test]
    async fn pdf_report_goes_through_fetcher_then_analysis() {
        let pdf = MockServer::start(MockResponse::bytes(
            200,
            "application/pdf",
            pdf_with_pages(&["Hemoglobin 13.5 g/dL", "WBC 6.1 x10^3/uL"]),
        ));
        let gemini = MockServer::start(MockResponse::json(
            200,
            json!({ "candidates": [{ "content": { "parts": [{ "text": "Verdict: Normal" }] } }] }),
        ));
        let dir = tempfile::tempdir().unwrap();

        let mut gemini_config = GeminiConfig::new(Some("g-key".to_string()));
        gemini_config.base_url = gemini.base_url().to_string();
        let config = ServiceConfig {
            gemini: gemini_config,
            ocr: OcrConfig::new(None),
            fetch: FetchConfig {
                scratch_dir: dir.path().to_path_buf(),
                ..FetchConfig::default()
            },
        };
        let pipeline = ReportPipeline::new(Client::new(), config);

        let feedback = pipeline
            .analyze_document(&parse(&pdf.url("/cbc.pdf")), None)
            .await;

        assert_eq!(feedback.feedback, "Verdict: Normal");
        assert_eq!(pdf.requests().len(), 1);
        let body = gemini.requests()[0].body_json();
        assert!(body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Hemoglobin 13.5 g/dL WBC 6.1 x10^3/uL"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_extraction_ends_in_no_readable_text() {
        let pdf = MockServer::start(MockResponse::bytes(500, "text/plain", "boom"));
        let gemini = MockServer::start(MockResponse::json(200, json!({})));
        let dir = tempfile::tempdir().unwrap();

        let mut gemini_config = GeminiConfig::new(Some("g-key".to_string()));
        gemini_config.base_url = gemini.base_url().to_string();
        let config = ServiceConfig {
            gemini: gemini_config,
            ocr: OcrConfig::new(None),
            fetch: FetchConfig {
                scratch_dir: dir.path().to_path_buf(),
                ..FetchConfig::default()
            },
        };
        let pipeline = ReportPipeline::new(Client::new(), config);

        let feedback = pipeline
            .analyze_document(&parse(&pdf.url("/report.pdf")), None)
            .await;

        assert_eq!(feedback.feedback, NO_READABLE_TEXT);
        assert!(gemini.requests().is_empty());
    }
}
