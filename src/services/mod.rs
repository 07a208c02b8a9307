pub mod docx_reader;
pub mod docx_writer;
pub mod extractor;
pub mod ocr_service;
pub mod pdf_writer;
pub mod rasterizer;

pub use docx_writer::build_docx;
pub use extractor::DocumentExtractor;
pub use ocr_service::{OcrEngine, OcrWorker, TesseractEngine};
pub use pdf_writer::write_pdf;
pub use rasterizer::{PdfRasterizer, PdftoppmRasterizer, RasterizedDocument};
