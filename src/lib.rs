//! Local OCR Extractor
//!
//! Upload an image, PDF or Word document and get its text back page by page;
//! edited text can be exported again as PDF or DOCX.

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use handlers::create_router;
pub use state::AppState;
