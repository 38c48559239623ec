// Minimal PDF utilities for the document fetcher.
// Always keep this module small and dependency-light.

use anyhow::Context;
use std::path::Path;

/// Extracts the text of every page of the PDF stored at `path`, in page order.
/// This is a thin wrapper over the `pdf-extract` crate API.
pub fn extract_page_texts(path: &Path) -> anyhow::Result<Vec<String>> {
    let pages = pdf_extract::extract_text_by_pages(path).with_context(|| {
        format!(
            "failed to extract text from PDF at {} using pdf-extract",
            path.display()
        )
    })?;
    Ok(pages)
}

/// Joins page texts into one string. Every whitespace run, inside a page or
/// between pages, collapses to a single space; the result is trimmed.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .flat_map(|page| page.as_ref().split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns true if given content-type or head indicates a PDF file.
/// - Content-Type: application/pdf (case-insensitive, substring match)
/// - Magic bytes: %PDF-
pub fn is_pdf(content_type: Option<&str>, head: &[u8]) -> bool {
    let ct = content_type.unwrap_or("").to_ascii_lowercase();
    ct.contains("application/pdf") || head.starts_with(b"%PDF-")
}
