pub mod content_guard;
pub mod gemini;
pub mod lab_report;
pub mod ocr_space;
pub mod pdf;
pub mod pdf_fetcher;
pub mod pipeline;
pub mod scratch;
