use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const OCR_SPACE_ENDPOINT: &str = "https://api.ocr.space/parse/image";

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 50 * 1024 * 1024; // 50 MiB

/// Credentials and endpoint for the generative-language API.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// `<base>/v1beta/models/<model>:generateContent`, without the key.
    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// Credentials and endpoint for the OCR.space API.
#[derive(Clone)]
pub struct OcrConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
}

impl OcrConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            endpoint: OCR_SPACE_ENDPOINT.to_string(),
        }
    }
}

/// Settings for the PDF download path.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub scratch_dir: PathBuf,
    /// `None` disables the timeout entirely.
    pub timeout: Option<Duration>,
    /// `None` lets documents of any size through.
    pub max_bytes: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
            timeout: Some(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS)),
            max_bytes: Some(DEFAULT_MAX_DOCUMENT_BYTES),
        }
    }
}

// Keys must never reach the logs through `{:?}`.
fn redact(key: &Option<String>) -> &'static str {
    if key.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("api_key", &redact(&self.api_key))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Values given on the command line. Anything left `None` falls back to the
/// environment, then to the built-in default.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub gemini_api_key: Option<String>,
    pub ocr_space_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub fetch_timeout_secs: Option<u64>,
    pub max_document_bytes: Option<u64>,
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub gemini: GeminiConfig,
    pub ocr: OcrConfig,
    pub fetch: FetchConfig,
}

impl ServiceConfig {
    pub fn resolve<F>(cli: CliOverrides, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values are treated as unset so `FOO=` does not count as a key.
        let lookup = |cli_value: Option<String>, key: &str| {
            cli_value
                .or_else(|| env(key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut gemini = GeminiConfig::new(lookup(cli.gemini_api_key, "GEMINI_API_KEY"));
        if let Some(model) = lookup(cli.gemini_model, "GEMINI_MODEL") {
            gemini.model = model;
        }

        let ocr = OcrConfig::new(lookup(cli.ocr_space_api_key, "OCR_SPACE_API_KEY"));

        let number = |cli_value: Option<u64>, key: &str| {
            cli_value.or_else(|| env(key).and_then(|v| v.trim().parse::<u64>().ok()))
        };

        // For both limits, 0 means "no limit".
        let mut fetch = FetchConfig::default();
        if let Some(secs) = number(cli.fetch_timeout_secs, "FETCH_TIMEOUT_SECS") {
            fetch.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(bytes) = number(cli.max_document_bytes, "MAX_DOCUMENT_BYTES") {
            fetch.max_bytes = (bytes > 0).then_some(bytes);
        }
        if let Some(dir) = cli
            .scratch_dir
            .or_else(|| env("SCRATCH_DIR").filter(|v| !v.trim().is_empty()).map(PathBuf::from))
        {
            fetch.scratch_dir = dir;
        }

        Self { gemini, ocr, fetch }
    }
}
