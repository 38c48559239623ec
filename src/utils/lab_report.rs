use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::utils::content_guard::truncate_chars;
use crate::utils::gemini::{GeminiError, GeminiService};

/// Reports with fewer characters than this are not worth sending.
pub const MIN_REPORT_CHARS: usize = 30;
/// Only this many leading characters of the report reach the prompt.
pub const MAX_PROMPT_CHARS: usize = 3000;

pub const NO_READABLE_TEXT: &str = "⚠ No readable text found in report.";
pub const NO_ANALYSIS_GENERATED: &str = "⚠ No analysis was generated for this report.";
pub const ANALYSIS_UNAVAILABLE: &str =
    "⚠ Unable to analyze the report right now. Please try again later.";

// The report goes last, fenced by `"""` lines.
const PROMPT_TEMPLATE: &str = "You are a careful medical assistant helping a patient understand a laboratory report.
Read the report text below and respond in plain language with exactly these four sections:

1. Summary: what was tested and the key results.
2. Implications: what the results may mean for the patient's health.
3. Recommendations: sensible next steps, including when to consult a doctor.
4. Verdict: state whether the report looks Normal or Abnormal overall.

Keep the whole answer under 200 words. Do not invent values that are not in the report.

Report text:
\"\"\"
{report}
\"\"\"";

/// The analysis record returned to callers. `feedback` is always filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub feedback: String,
}

impl Feedback {
    pub fn new(feedback: impl Into<String>) -> Self {
        Self {
            feedback: feedback.into(),
        }
    }
}

/// What a successful analysis call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Generated(String),
    /// Input too short; no remote call was made.
    NoReadableText,
    /// The API answered without any candidate text.
    NoOutput,
}

impl AnalysisOutcome {
    pub fn into_feedback(self) -> Feedback {
        match self {
            Self::Generated(text) => Feedback::new(text),
            Self::NoReadableText => Feedback::new(NO_READABLE_TEXT),
            Self::NoOutput => Feedback::new(NO_ANALYSIS_GENERATED),
        }
    }
}

/// Embeds the first [`MAX_PROMPT_CHARS`] characters of `report` in the fixed
/// analysis prompt.
pub fn build_prompt(report: &str) -> String {
    PROMPT_TEMPLATE.replace("{report}", truncate_chars(report, MAX_PROMPT_CHARS))
}

pub struct LabReportAnalyzer {
    gemini: GeminiService,
}

impl LabReportAnalyzer {
    pub fn new(gemini: GeminiService) -> Self {
        Self { gemini }
    }

    pub async fn try_analyze(&self, text: &str) -> Result<AnalysisOutcome, GeminiError> {
        let usable_chars = text.trim().chars().count();
        if usable_chars < MIN_REPORT_CHARS {
            info!(target: "lab_report", chars = usable_chars, "Report text too short; skipping analysis");
            return Ok(AnalysisOutcome::NoReadableText);
        }

        let prompt = build_prompt(text);
        match self.gemini.generate_content(&prompt).await? {
            Some(generated) => Ok(AnalysisOutcome::Generated(generated)),
            None => {
                warn!(target: "lab_report", "Gemini returned no candidate text");
                Ok(AnalysisOutcome::NoOutput)
            }
        }
    }

    /// Never fails: every error is logged and replaced by a fixed message.
    pub async fn analyze(&self, text: &str) -> Feedback {
        match self.try_analyze(text).await {
            Ok(outcome) => outcome.into_feedback(),
            Err(GeminiError::MissingCredential) => {
                error!(target: "lab_report", "GEMINI_API_KEY is not configured; cannot analyze report");
                Feedback::new(ANALYSIS_UNAVAILABLE)
            }
            Err(e) => {
                error!(target: "lab_report", transient = e.is_transient(), "Report analysis failed: {}", e);
                Feedback::new(ANALYSIS_UNAVAILABLE)
            }
        }
    }
}
