//! Document text extraction.
use std::sync::Arc;

use {axum::body::Bytes, tracing::debug};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The bytes are not a document we can read.
    #[error("could not read document: {0}")]
    Parse(String),

    #[error("document parser crashed")]
    Panicked,
}

/// Turns uploaded bytes into raw text. Called off the async runtime.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Extracts the text layer of a PDF with `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractError::Parse(e.to_string()))?;
        debug!(bytes = bytes.len(), chars = text.len(), "extracted pdf text");
        Ok(text)
    }
}

/// Run `extractor` on the blocking pool. A panic inside the parser becomes
/// [`ExtractError::Panicked`].
pub async fn extract_blocking(
    extractor: Arc<dyn TextExtractor>,
    bytes: Bytes,
) -> Result<String, ExtractError> {
    tokio::task::spawn_blocking(move || extractor.extract(&bytes))
        .await
        .map_err(|_| ExtractError::Panicked)?
}

/// Upload names are checked by extension only.
pub fn is_pdf_filename(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pdf")
}
