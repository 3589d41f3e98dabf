//! PDF text extraction using `pdftotext` (poppler-utils).

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("document is empty")]
    Empty,

    #[error("document is not a PDF (missing %PDF header)")]
    NotPdf,

    #[error("no readable text in document")]
    NoText,

    #[error("pdftotext timed out after {0:?}")]
    Timeout(Duration),

    #[error("pdftotext failed: {0}")]
    Tool(String),

    #[error("failed to stage document: {0}")]
    Io(#[from] std::io::Error),
}

/// Extract the text of every page, joined with single spaces.
pub async fn extract_text(data: &[u8], timeout: Duration) -> Result<String, ExtractError> {
    if data.is_empty() {
        return Err(ExtractError::Empty);
    }
    if !data.starts_with(b"%PDF") {
        return Err(ExtractError::NotPdf);
    }

    // pdftotext reads from a file path
    let mut tmpfile = NamedTempFile::new()?;
    tmpfile.write_all(data)?;
    tmpfile.flush()?;

    let raw = run_pdftotext(tmpfile.path(), timeout).await?;
    let text = join_pages(&raw);
    if text.trim().is_empty() {
        return Err(ExtractError::NoText);
    }

    log::debug!("[DOCUMENTS] Extracted {} chars from {} byte PDF", text.len(), data.len());
    Ok(text)
}

async fn run_pdftotext(path: &Path, timeout: Duration) -> Result<String, ExtractError> {
    let output = tokio::time::timeout(
        timeout,
        Command::new("pdftotext")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| ExtractError::Timeout(timeout))?
    .map_err(|e| ExtractError::Tool(format!("failed to execute pdftotext: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractError::Tool(format!(
            "exit {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// pdftotext ends every page with a form feed. Pages without text are dropped.
fn join_pages(raw: &str) -> String {
    raw.split('\u{c}')
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_pages_skips_blank_pages() {
        let raw = "First page.\n\u{c}\n\u{c}Third page.\n\u{c}";
        assert_eq!(join_pages(raw), "First page. Third page.");
        assert_eq!(join_pages("\u{c}\u{c}"), "");
    }

    #[tokio::test]
    async fn test_rejects_empty_and_non_pdf() {
        let timeout = Duration::from_secs(5);
        assert!(matches!(extract_text(b"", timeout).await, Err(ExtractError::Empty)));
        assert!(matches!(
            extract_text(b"PK\x03\x04 zip archive", timeout).await,
            Err(ExtractError::NotPdf)
        ));
        // shorter than the magic bytes
        assert!(matches!(extract_text(b"%PD", timeout).await, Err(ExtractError::NotPdf)));
    }
}
