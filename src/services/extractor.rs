use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::models::{DocumentKind, PageText};
use crate::services::docx_reader;
use crate::services::ocr_service::OcrEngine;
use crate::services::rasterizer::PdfRasterizer;

/// Routes a stored upload to the backend for its type and returns the text
/// of each page in document order.
#[derive(Clone)]
pub struct DocumentExtractor {
    ocr: Arc<dyn OcrEngine>,
    rasterizer: Arc<dyn PdfRasterizer>,
    render_dpi: u32,
}

impl DocumentExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>, rasterizer: Arc<dyn PdfRasterizer>, render_dpi: u32) -> Self {
        Self {
            ocr,
            rasterizer,
            render_dpi,
        }
    }

    pub fn ocr_name(&self) -> &'static str {
        self.ocr.name()
    }

    pub fn rasterizer_name(&self) -> &'static str {
        self.rasterizer.name()
    }

    pub fn ocr_available(&self) -> bool {
        self.ocr.is_available()
    }

    pub fn rasterizer_available(&self) -> bool {
        self.rasterizer.is_available()
    }

    pub async fn extract(
        &self,
        path: &Path,
        kind: DocumentKind,
    ) -> Result<Vec<PageText>, ExtractionError> {
        let start = Instant::now();
        let pages = match kind {
            DocumentKind::Docx => vec![PageText::new(1, self.extract_docx(path).await?)],
            DocumentKind::Jpeg | DocumentKind::Png => {
                vec![PageText::new(1, self.extract_image(path).await?)]
            }
            DocumentKind::Pdf => self.extract_pdf(path).await?,
        };

        info!(
            mime_type = %kind,
            ocr = self.ocr.name(),
            pages = pages.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Extraction finished"
        );
        Ok(pages)
    }

    async fn extract_docx(&self, path: &Path) -> Result<String, ExtractionError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || docx_reader::extract_raw_text(&path))
            .await
            .map_err(|e| ExtractionError::docx(format!("parser task failed: {}", e)))?
    }

    async fn extract_image(&self, path: &Path) -> Result<String, ExtractionError> {
        probe_image(path).await?;

        let mut worker = self.ocr.acquire().await?;
        // The worker is dropped, and so released, on both outcomes
        worker.recognize(path).await
    }

    async fn extract_pdf(&self, path: &Path) -> Result<Vec<PageText>, ExtractionError> {
        let document = self.rasterizer.rasterize(path, self.render_dpi).await?;
        if document.is_empty() {
            warn!(pdf = %path.display(), "PDF has no pages");
            return Ok(Vec::new());
        }

        let total = document.len();
        let mut worker = self.ocr.acquire().await?;
        let mut pages = Vec::with_capacity(total);

        for (index, image) in document.pages().iter().enumerate() {
            let page = (index + 1) as u32;
            debug!(page, total, "Processing PDF page");

            let text = worker.recognize(image).await.map_err(|e| {
                let details = match e {
                    ExtractionError::Ocr { message } => message,
                    other => other.to_string(),
                };
                ExtractionError::ocr(format!(
                    "page analysis failed on page {} of {}: {}",
                    page, total, details
                ))
            })?;
            pages.push(PageText::new(page, text));
        }

        Ok(pages)
    }
}

/// Reject files the image decoder cannot even size before starting OCR.
async fn probe_image(path: &Path) -> Result<(), ExtractionError> {
    let probe_path = path.to_path_buf();
    let dimensions = tokio::task::spawn_blocking(move || {
        // Sniff the content; the stored extension comes from the client
        image::io::Reader::open(&probe_path)?
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
    .await
    .map_err(|e| ExtractionError::ocr(format!("image probe task failed: {}", e)))?
    .map_err(|e| ExtractionError::ocr(format!("unreadable image: {}", e)))?;

    debug!(
        image = %path.display(),
        width = dimensions.0,
        height = dimensions.1,
        "Image probed"
    );
    Ok(())
}
