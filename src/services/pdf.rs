use std::io::Write;

use anyhow::{Context, Result};
use async_trait::async_trait;

/// PDF text acquisition seam.
///
/// Returns one string per page, in page order. A page with no extractable
/// text yields an empty string rather than failing the document.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

pub struct PdfParser;

const EXTRACTION_TIMEOUT_SECS: u64 = 120;

#[async_trait]
impl DocumentParser for PdfParser {
    /// Extraction is CPU-bound, so it runs on the blocking thread pool
    /// with a timeout to avoid hanging forever on problematic files.
    async fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let bytes = bytes.to_vec();
        let handle = tokio::task::spawn_blocking(move || extract_pages_sync(&bytes));

        match tokio::time::timeout(
            std::time::Duration::from_secs(EXTRACTION_TIMEOUT_SECS),
            handle,
        )
        .await
        {
            Ok(join_result) => join_result.context("PDF extraction task panicked")?,
            Err(_) => anyhow::bail!("PDF extraction timed out after {EXTRACTION_TIMEOUT_SECS}s"),
        }
    }
}

/// Write the bytes to a scoped temp file and extract text page by page.
/// The temp file is removed on drop, on both success and failure paths.
fn extract_pages_sync(bytes: &[u8]) -> Result<Vec<String>> {
    let mut tmp = tempfile::NamedTempFile::new().context("Failed to create temp file")?;
    tmp.write_all(bytes).context("Failed to write PDF to temp file")?;
    tmp.flush()?;

    let pages = pdf_extract::extract_text_by_pages(tmp.path())
        .context("Failed to extract text from PDF")?;

    tracing::info!(
        "PDF extracted: {} pages, {} chars",
        pages.len(),
        pages.iter().map(|p| p.len()).sum::<usize>()
    );

    Ok(pages)
}
