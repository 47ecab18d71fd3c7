//! Plain-text extraction from downloaded PDFs via `pdftotext`.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

const PDFTOTEXT: &str = "pdftotext (install poppler-utils)";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a local PDF into its text layer.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// All pages in order, trimmed. `None` when the file cannot be read or
    /// has no text layer.
    async fn extract(&self, path: &Path) -> Option<String>;
}

/// Map process output to text, distinguishing a missing binary from a failed run.
fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, ExtractionError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ExtractionError::ExtractionFailed(format!(
                    "{}: {}",
                    error_prefix,
                    stderr.trim()
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractionError::Io(e)),
    }
}

/// Page separators become line breaks, then the whole text is trimmed.
fn normalize_pages(raw: &str) -> Option<String> {
    let text = raw.replace('\u{000C}', "\n");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// [`TextExtractor`] backed by poppler's `pdftotext`.
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Whether `pdftotext` can be spawned on this host.
    pub async fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .await
            .is_ok()
    }

    pub async fn run_pdftotext(&self, path: &Path) -> Result<String, ExtractionError> {
        let output = Command::new("pdftotext")
            .args(["-enc", "UTF-8"])
            .arg(path)
            .arg("-")
            .kill_on_drop(true)
            .output()
            .await;

        handle_cmd_output(output, PDFTOTEXT, "pdftotext failed")
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, path: &Path) -> Option<String> {
        match self.run_pdftotext(path).await {
            Ok(raw) => {
                let text = normalize_pages(&raw);
                if text.is_none() {
                    tracing::debug!("No text layer in {}", path.display());
                }
                text
            }
            Err(e) => {
                tracing::warn!("Text extraction failed for {}: {}", path.display(), e);
                None
            }
        }
    }
}
