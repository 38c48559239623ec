use serde_json::{json, Value};
use std::fmt;

/// Which extractor a document needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Parsed locally from the downloaded bytes
    Pdf,
    /// Sent by URL to the hosted OCR service
    Image,
}

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff", "heic",
];

impl DocumentKind {
    /// Parses a caller-supplied hint such as `"pdf"`, `"image"` or a MIME type.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim().to_ascii_lowercase();
        let main = hint.split(';').next().unwrap_or("").trim();

        match main {
            "pdf" | "application/pdf" => Some(Self::Pdf),
            "image" | "img" | "ocr" => Some(Self::Image),
            m if m.starts_with("image/") => Some(Self::Image),
            m if IMAGE_EXTENSIONS.contains(&m) => Some(Self::Image),
            _ => None,
        }
    }

    /// Guesses the kind from the extension of the URL path, ignoring query and fragment.
    pub fn from_url(url: &url::Url) -> Option<Self> {
        let last_segment = url.path_segments()?.next_back()?;
        let (_, ext) = last_segment.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();

        if ext == "pdf" {
            Some(Self::Pdf)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the first `max` characters of `s` (Unicode scalar values, not bytes).
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Builds a standardized error payload string for tool errors.
/// The resulting text is intended to be returned as a textual tool error body.
/// First line: short human-readable message.
/// Then a JSON object with fields: code, message, details.
pub fn build_error_payload(code: &str, message: &str, details: Value) -> String {
    let obj = json!({
        "code": code,
        "message": message,
        "details": details,
    });
    let mut out = String::new();
    out.push_str(message);
    out.push('\n');
    out.push_str(&obj.to_string());
    out
}
