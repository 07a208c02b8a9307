use std::sync::Arc;

use crate::config::Config;
use crate::services::{DocumentExtractor, OcrEngine, PdfRasterizer, PdftoppmRasterizer, TesseractEngine};

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub extractor: DocumentExtractor,
}

impl AppState {
    /// State backed by the `tesseract` and `pdftoppm` command line tools.
    pub fn from_config(config: Config) -> Self {
        let ocr = Arc::new(TesseractEngine::new(
            config.tesseract_bin.clone(),
            config.ocr_language.clone(),
        ));
        let rasterizer = Arc::new(PdftoppmRasterizer::new(config.pdftoppm_bin.clone()));
        Self::with_backends(config, ocr, rasterizer)
    }

    pub fn with_backends(
        config: Config,
        ocr: Arc<dyn OcrEngine>,
        rasterizer: Arc<dyn PdfRasterizer>,
    ) -> Self {
        let extractor = DocumentExtractor::new(ocr, rasterizer, config.pdf_render_dpi());
        Self {
            config: Arc::new(config),
            extractor,
        }
    }
}
