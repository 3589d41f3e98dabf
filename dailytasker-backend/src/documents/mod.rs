//! Uploaded document handling: PDF text extraction and a naive summary.

pub mod pdf_text;
pub mod summarizer;

pub use pdf_text::{extract_text, ExtractError};
pub use summarizer::summarize;
