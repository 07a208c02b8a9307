//! Shared fakes and request builders for the integration suites.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use ocr_extractor::config::Config;
use ocr_extractor::error::ExtractionError;
use ocr_extractor::services::{OcrEngine, OcrWorker, PdfRasterizer, RasterizedDocument};
use ocr_extractor::AppState;

pub const BOUNDARY: &str = "ocr-extractor-test-boundary";

/// Counters shared between a fake engine and the workers it hands out.
#[derive(Default)]
pub struct OcrStats {
    pub acquired: AtomicUsize,
    pub live: AtomicUsize,
    pub recognized: Mutex<Vec<PathBuf>>,
}

impl OcrStats {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn recognized(&self) -> Vec<PathBuf> {
        self.recognized.lock().unwrap().clone()
    }
}

/// OCR engine answering from a table keyed by image file stem.
#[derive(Clone, Default)]
pub struct FakeOcr {
    texts: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    default_text: String,
    default_delay: Option<Duration>,
    fail_on: Option<String>,
    pub stats: Arc<OcrStats>,
}

impl FakeOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, stem: &str, text: &str) -> Self {
        self.texts.insert(stem.to_string(), text.to_string());
        self
    }

    pub fn with_delay(mut self, stem: &str, delay: Duration) -> Self {
        self.delays.insert(stem.to_string(), delay);
        self
    }

    pub fn with_default_text(mut self, text: &str) -> Self {
        self.default_text = text.to_string();
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn failing_on(mut self, stem: &str) -> Self {
        self.fail_on = Some(stem.to_string());
        self
    }
}

#[async_trait]
impl OcrEngine for FakeOcr {
    fn name(&self) -> &'static str {
        "fake-ocr"
    }

    async fn acquire(&self) -> Result<Box<dyn OcrWorker>, ExtractionError> {
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        self.stats.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeWorker {
            engine: self.clone(),
        }))
    }

    fn is_available(&self) -> bool {
        true
    }
}

struct FakeWorker {
    engine: FakeOcr,
}

#[async_trait]
impl OcrWorker for FakeWorker {
    async fn recognize(&mut self, image: &Path) -> Result<String, ExtractionError> {
        let stem = image
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let delay = self.engine.delays.get(&stem).copied().or(self.engine.default_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.engine
            .stats
            .recognized
            .lock()
            .unwrap()
            .push(image.to_path_buf());

        if self.engine.fail_on.as_deref() == Some(stem.as_str()) {
            return Err(ExtractionError::ocr(format!("cannot read {}", stem)));
        }

        Ok(self
            .engine
            .texts
            .get(&stem)
            .cloned()
            .unwrap_or_else(|| self.engine.default_text.clone()))
    }
}

impl Drop for FakeWorker {
    fn drop(&mut self) {
        self.engine.stats.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Rasterizer producing `page-1.png` .. `page-N.png` in a scratch directory,
/// or failing the way an encrypted PDF does.
#[derive(Clone, Default)]
pub struct FakeRasterizer {
    page_count: usize,
    fail: bool,
    pub calls: Arc<AtomicUsize>,
}

impl FakeRasterizer {
    pub fn with_pages(page_count: usize) -> Self {
        Self {
            page_count,
            ..Self::default()
        }
    }

    pub fn password_protected() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfRasterizer for FakeRasterizer {
    fn name(&self) -> &'static str {
        "fake-rasterizer"
    }

    async fn rasterize(&self, _pdf: &Path, _dpi: u32) -> Result<RasterizedDocument, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ExtractionError::pdf_conversion(
                "Command Line Error: Incorrect password",
            ));
        }

        let scratch = TempDir::new()?;
        let mut pages = Vec::with_capacity(self.page_count);
        for page in 1..=self.page_count {
            let path = scratch.path().join(format!("page-{}.png", page));
            std::fs::write(&path, b"png")?;
            pages.push(path);
        }
        Ok(RasterizedDocument::new(pages, Some(scratch)))
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Everything a router test needs; the temp directories live as long as it.
pub struct TestApp {
    pub state: AppState,
    pub ocr: FakeOcr,
    pub rasterizer: FakeRasterizer,
    pub upload_dir: TempDir,
    pub static_dir: TempDir,
}

impl TestApp {
    pub fn new(ocr: FakeOcr, rasterizer: FakeRasterizer) -> Self {
        Self::with_config(ocr, rasterizer, |_| {})
    }

    pub fn with_config(
        ocr: FakeOcr,
        rasterizer: FakeRasterizer,
        customize: impl FnOnce(&mut Config),
    ) -> Self {
        let upload_dir = TempDir::new().unwrap();
        let static_dir = TempDir::new().unwrap();

        let mut config = Config {
            upload_dir: upload_dir.path().to_path_buf(),
            static_dir: static_dir.path().to_path_buf(),
            ..Config::default()
        };
        customize(&mut config);

        let state = AppState::with_backends(
            config,
            Arc::new(ocr.clone()),
            Arc::new(rasterizer.clone()),
        );

        Self {
            state,
            ocr,
            rasterizer,
            upload_dir,
            static_dir,
        }
    }

    pub fn router(&self) -> axum::Router {
        ocr_extractor::create_router(self.state.clone())
    }

    pub fn stored_uploads(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path()).unwrap().count()
    }
}

/// A `multipart/form-data` body with a single file part.
pub fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    write!(
        body,
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
        BOUNDARY, field, file_name, content_type
    )
    .unwrap();
    body.extend_from_slice(data);
    write!(body, "\r\n--{}--\r\n", BOUNDARY).unwrap();
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

pub fn sample_jpeg() -> Vec<u8> {
    encode_image(image::ImageOutputFormat::Jpeg(85))
}

pub fn sample_png() -> Vec<u8> {
    encode_image(image::ImageOutputFormat::Png)
}

fn encode_image(format: image::ImageOutputFormat) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(32, 16, image::Rgb([255, 255, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut bytes, format)
        .unwrap();
    bytes.into_inner()
}

/// Minimal DOCX archive holding the given paragraphs.
pub fn sample_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p))
        .collect();
    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{}</w:body></w:document>",
        body
    );

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("word/document.xml", zip::write::FileOptions::default())
        .unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}
