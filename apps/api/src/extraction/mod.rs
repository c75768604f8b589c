//! Document text extraction — the thin edge between uploaded files and the engine.
//!
//! Layout parsing is not our concern: an extractor hands back raw text and the
//! normalizer turns it into a single line. Swap `DocumentExtractor` for another
//! `TextExtractor` to support more formats.

pub mod normalizer;

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::extraction::normalizer::normalize;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to extract text from '{filename}': {reason}")]
    ExtractionFailed { filename: String, reason: String },
}

/// Turns a stored document into normalized single-line text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String, ExtractionError>;

    /// Reads the document from disk and extracts it.
    fn extract_path(&self, path: &Path) -> Result<String, ExtractionError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = std::fs::read(path).map_err(|e| ExtractionError::ExtractionFailed {
            filename: filename.clone(),
            reason: e.to_string(),
        })?;
        self.extract(&filename, &bytes)
    }
}

/// Default extractor: PDF via `pdf-extract`, plain text and markdown as UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
        let extension = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let raw = match extension.as_str() {
            "pdf" => pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
                ExtractionError::ExtractionFailed {
                    filename: filename.to_string(),
                    reason: e.to_string(),
                }
            })?,
            "txt" | "md" => String::from_utf8(bytes.to_vec()).map_err(|e| {
                ExtractionError::ExtractionFailed {
                    filename: filename.to_string(),
                    reason: e.to_string(),
                }
            })?,
            "" => return Err(ExtractionError::UnsupportedFormat("<none>".to_string())),
            other => return Err(ExtractionError::UnsupportedFormat(format!(".{other}"))),
        };

        debug!(filename, raw_chars = raw.chars().count(), "document extracted");
        Ok(normalize(&raw))
    }
}
