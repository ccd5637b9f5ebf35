use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::{AppError, UpstreamError};

const PDF_MAGIC: &[u8] = b"%PDF";

#[async_trait]
pub trait ResumeExtractor: Send + Sync {
    /// Returns the plain text of an uploaded resume. Never returns an empty string.
    async fn extract_text(&self, bytes: Vec<u8>) -> Result<String, AppError>;
}

/// Text-layer extraction via `pdf-extract`. Scanned PDFs without a text layer
/// come back empty and are reported as unreadable.
pub struct PdfResumeExtractor;

#[async_trait]
impl ResumeExtractor for PdfResumeExtractor {
    async fn extract_text(&self, bytes: Vec<u8>) -> Result<String, AppError> {
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(unreadable("upload is not a PDF document"));
        }

        let size = bytes.len();
        // PDF parsing is CPU-bound and can take a while on large files.
        let extracted =
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;

        let text = match extracted {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("Resume PDF could not be parsed ({size} bytes): {e}");
                return Err(unreadable(&e.to_string()));
            }
            // pdf-extract panics on some malformed documents.
            Err(e) if e.is_panic() => {
                warn!("Resume PDF parser panicked ({size} bytes)");
                return Err(unreadable("parser panicked on malformed document"));
            }
            Err(e) => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "spawn_blocking failed in resume extraction: {e}"
                )))
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(unreadable("no text layer found"));
        }

        info!("Extracted {} chars of resume text from {size} bytes", text.len());
        Ok(text.to_string())
    }
}

fn unreadable(detail: &str) -> AppError {
    UpstreamError::UnreadableDocument {
        detail: detail.to_string(),
    }
    .into()
}
