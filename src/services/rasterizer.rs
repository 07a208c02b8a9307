use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::ExtractionError;

const PAGE_PREFIX: &str = "page";

/// Page images of one PDF, in page order. The images live in a scratch
/// directory that is removed when this value is dropped.
#[derive(Debug)]
pub struct RasterizedDocument {
    pages: Vec<PathBuf>,
    _scratch: Option<TempDir>,
}

impl RasterizedDocument {
    pub fn new(pages: Vec<PathBuf>, scratch: Option<TempDir>) -> Self {
        Self {
            pages,
            _scratch: scratch,
        }
    }

    pub fn pages(&self) -> &[PathBuf] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[async_trait]
pub trait PdfRasterizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Render every page of `pdf` at `dpi`. Any failure here is a conversion
    /// failure, never an OCR failure.
    async fn rasterize(&self, pdf: &Path, dpi: u32) -> Result<RasterizedDocument, ExtractionError>;

    fn is_available(&self) -> bool;
}

/// Rasterization through poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: PathBuf,
}

impl PdftoppmRasterizer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl PdfRasterizer for PdftoppmRasterizer {
    fn name(&self) -> &'static str {
        "pdftoppm"
    }

    async fn rasterize(&self, pdf: &Path, dpi: u32) -> Result<RasterizedDocument, ExtractionError> {
        let scratch = tempfile::Builder::new()
            .prefix("pdf-pages-")
            .tempdir()
            .map_err(|e| {
                ExtractionError::pdf_conversion(format!("failed to create scratch directory: {}", e))
            })?;

        debug!(pdf = %pdf.display(), dpi, "Rasterizing PDF");

        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg(pdf)
            .arg(scratch.path().join(PAGE_PREFIX))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractionError::pdf_conversion(format!(
                        "PDF rasterizer not available: {} was not found",
                        self.binary.display()
                    ))
                } else {
                    ExtractionError::pdf_conversion(format!("failed to run pdftoppm: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::pdf_conversion(format!(
                "pdftoppm exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let pages = collect_page_images(scratch.path())?;
        info!(pdf = %pdf.display(), pages = pages.len(), "PDF rasterized");

        Ok(RasterizedDocument::new(pages, Some(scratch)))
    }

    fn is_available(&self) -> bool {
        // pdftoppm -v prints to stderr and may exit non-zero on old poppler
        std::process::Command::new(&self.binary)
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

/// pdftoppm names pages `page-1.png` or `page-01.png` depending on the page
/// count, so order by the parsed number rather than by name.
fn collect_page_images(dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        ExtractionError::pdf_conversion(format!("failed to read rasterized pages: {}", e))
    })?;

    let mut numbered: Vec<(u32, PathBuf)> = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| {
                ExtractionError::pdf_conversion(format!("failed to read rasterized pages: {}", e))
            })?
            .path();
        if let Some(number) = page_number(&path) {
            numbered.push((number, path));
        }
    }

    numbered.sort_by_key(|(number, _)| *number);
    Ok(numbered.into_iter().map(|(_, path)| path).collect())
}

fn page_number(path: &Path) -> Option<u32> {
    if path.extension().and_then(|e| e.to_str()) != Some("png") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix(PAGE_PREFIX)?
        .strip_prefix('-')?
        .parse()
        .ok()
}
