use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::ExtractionError;

/// Source of OCR workers.
///
/// A worker is a scoped resource: it is released when dropped, so every exit
/// path of the code holding it gives it back.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn acquire(&self) -> Result<Box<dyn OcrWorker>, ExtractionError>;

    fn is_available(&self) -> bool;
}

#[async_trait]
pub trait OcrWorker: Send {
    /// Recognise the text of a single raster image.
    async fn recognize(&mut self, image: &Path) -> Result<String, ExtractionError>;
}

/// OCR through the `tesseract` command line tool.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    language: String,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    pub fn is_tesseract_available(binary: &Path) -> bool {
        std::process::Command::new(binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn acquire(&self) -> Result<Box<dyn OcrWorker>, ExtractionError> {
        debug!(language = %self.language, "Acquired tesseract worker");
        Ok(Box::new(TesseractWorker {
            binary: self.binary.clone(),
            language: self.language.clone(),
            recognized: 0,
        }))
    }

    fn is_available(&self) -> bool {
        Self::is_tesseract_available(&self.binary)
    }
}

pub struct TesseractWorker {
    binary: PathBuf,
    language: String,
    recognized: usize,
}

#[async_trait]
impl OcrWorker for TesseractWorker {
    async fn recognize(&mut self, image: &Path) -> Result<String, ExtractionError> {
        let start = Instant::now();

        // kill_on_drop: a request that times out takes the process with it
        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractionError::ocr(format!(
                        "OCR engine not available: {} was not found",
                        self.binary.display()
                    ))
                } else {
                    ExtractionError::ocr(format!("failed to run tesseract: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                image = %image.display(),
                code = output.status.code().unwrap_or(-1),
                "tesseract exited with an error"
            );
            return Err(ExtractionError::ocr(format!(
                "tesseract exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        self.recognized += 1;
        let text = normalize_ocr_output(&String::from_utf8_lossy(&output.stdout));
        info!(
            image = %image.display(),
            characters = text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "OCR recognition finished"
        );
        Ok(text)
    }
}

impl Drop for TesseractWorker {
    fn drop(&mut self) {
        debug!(recognized = self.recognized, "Released tesseract worker");
    }
}

/// Tesseract terminates each page with a form feed; a blank page comes back
/// as whitespace only.
fn normalize_ocr_output(raw: &str) -> String {
    let text = raw.trim_end_matches('\x0c');
    if text.trim().is_empty() {
        String::new()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_page_separator() {
        assert_eq!(normalize_ocr_output("Hello\nworld\n\x0c"), "Hello\nworld\n");
        assert_eq!(normalize_ocr_output("\x0c"), "");
        assert_eq!(normalize_ocr_output(" \n\x0c"), "");
        assert_eq!(normalize_ocr_output("a\x0cb"), "a\x0cb");
    }

    #[tokio::test]
    async fn missing_binary_is_an_ocr_error() {
        let engine = TesseractEngine::new("/nonexistent/tesseract-binary", "eng");
        assert!(!engine.is_available());

        let mut worker = engine.acquire().await.unwrap();
        let err = worker.recognize(Path::new("page.png")).await.unwrap_err();
        match err {
            ExtractionError::Ocr { message } => assert!(message.contains("not available")),
            other => panic!("expected OCR error, got {:?}", other),
        }
    }
}
