//! Text extraction: PDF bytes → plain text.
//!
//! The pipeline only depends on the [`TextExtractor`] trait; the PDF parser is
//! one implementation and tests swap in their own.

use crate::error::ExtractionError;
use async_trait::async_trait;
use tracing::debug;

/// Turns an uploaded document into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the text of every page, concatenated in page order.
    async fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// [`TextExtractor`] backed by `pdf-extract`.
///
/// Parsing is CPU-bound and the parser can panic on malformed input, so it
/// runs under `spawn_blocking`; a panic surfaces as
/// [`ExtractionError::TextExtraction`] instead of taking down the worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let owned = bytes.to_vec();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&owned))
            .await
            .map_err(|e| ExtractionError::TextExtraction {
                detail: format!("PDF parser task failed: {e}"),
            })?
            .map_err(|e| ExtractionError::TextExtraction {
                detail: e.to_string(),
            })?;

        debug!("Extracted {} chars of text", text.len());
        Ok(text)
    }
}
