use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorBody;

pub type AppResult<T> = Result<T, AppError>;

/// Failures raised by the extraction backends.
///
/// The variant is the classification: handlers never inspect the message
/// text to decide which friendly message to show.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF conversion failed. The file might be password protected or corrupted. Details: {message}")]
    PdfConversion { message: String },

    #[error("OCR processing failed: {message}")]
    Ocr { message: String },

    #[error("DOCX parsing failed: {message}")]
    DocxParse { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    pub fn pdf_conversion(message: impl Into<String>) -> Self {
        ExtractionError::PdfConversion {
            message: message.into(),
        }
    }

    pub fn ocr(message: impl Into<String>) -> Self {
        ExtractionError::Ocr {
            message: message.into(),
        }
    }

    pub fn docx(message: impl Into<String>) -> Self {
        ExtractionError::DocxParse {
            message: message.into(),
        }
    }

    /// Message shown to the user; the raw error goes in `details`.
    pub fn user_message(&self) -> &'static str {
        match self {
            ExtractionError::PdfConversion { .. } => {
                "Could not convert PDF. The file may be password protected or corrupted."
            }
            ExtractionError::Ocr { .. } => "OCR engine failed to read the image data.",
            ExtractionError::DocxParse { .. } => "Could not read the Word document structure.",
            ExtractionError::Io(_) => "An unexpected error occurred during processing.",
        }
    }
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("DOCX generation failed: {0}")]
    Docx(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("File size is too large. Max limit is {limit_mb}MB.")]
    FileTooLarge { limit_mb: usize },

    #[error("Invalid file type. Only JPG, PNG, PDF, and DOCX are allowed.")]
    InvalidFileType { mime_type: String },

    #[error("No file uploaded.")]
    MissingFile,

    #[error("Invalid upload: {message}")]
    InvalidFile { message: String },

    #[error("No text provided for generation.")]
    MissingText,

    #[error("Unsupported format requested.")]
    UnsupportedFormat { format: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Processing timed out.")]
    Timeout,

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            AppError::InvalidFileType { .. } => "INVALID_FILE_TYPE",
            AppError::MissingFile => "MISSING_FILE",
            AppError::InvalidFile { .. } => "INVALID_FILE",
            AppError::MissingText => "MISSING_TEXT",
            AppError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            AppError::InvalidRequest { .. } => "INVALID_REQUEST",
            AppError::Extraction(ExtractionError::PdfConversion { .. }) => "PDF_CONVERSION_ERROR",
            AppError::Extraction(ExtractionError::Ocr { .. }) => "OCR_ERROR",
            AppError::Extraction(ExtractionError::DocxParse { .. }) => "DOCX_PARSE_ERROR",
            AppError::Extraction(ExtractionError::Io(_)) => "PROCESSING_ERROR",
            AppError::Generation(_) => "GENERATION_ERROR",
            AppError::Timeout => "REQUEST_TIMEOUT",
            AppError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::FileTooLarge { .. }
            | AppError::InvalidFileType { .. }
            | AppError::MissingFile
            | AppError::InvalidFile { .. }
            | AppError::MissingText
            | AppError::UnsupportedFormat { .. }
            | AppError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Extraction(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body sent to the client.
    pub fn body(&self) -> ErrorBody {
        match self {
            AppError::Extraction(err) => ErrorBody {
                error: err.user_message().to_string(),
                details: Some(err.to_string()),
            },
            // Generation failures stay server-side
            AppError::Generation(_) => ErrorBody {
                error: "Failed to generate file.".to_string(),
                details: None,
            },
            AppError::Internal { .. } => ErrorBody {
                error: "An unexpected error occurred during processing.".to_string(),
                details: None,
            },
            other => ErrorBody {
                error: other.to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if status.is_server_error() {
            tracing::error!(
                error_code = error_code,
                status_code = %status,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::warn!(
                error_code = error_code,
                status_code = %status,
                error_message = %self,
                "Request rejected"
            );
        }

        (status, Json(self.body())).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal {
            message: format!("Background task failed: {}", err),
        }
    }
}

impl AppError {
    pub fn invalid_file(message: impl Into<String>) -> Self {
        AppError::InvalidFile {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        AppError::InvalidRequest {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_errors_map_to_category_messages() {
        let err = AppError::from(ExtractionError::pdf_conversion("Incorrect password"));
        let body = err.body();
        assert!(body.error.contains("password protected"));
        assert!(body.details.as_deref().unwrap_or("").contains("Incorrect password"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = AppError::from(ExtractionError::ocr("engine crashed")).body();
        assert_eq!(body.error, "OCR engine failed to read the image data.");

        let body = AppError::from(ExtractionError::docx("missing word/document.xml")).body();
        assert_eq!(body.error, "Could not read the Word document structure.");
    }

    #[test]
    fn io_failures_fall_back_to_generic_message() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let body = AppError::from(ExtractionError::from(io)).body();
        assert_eq!(body.error, "An unexpected error occurred during processing.");
        assert!(body.details.is_some());
    }

    #[test]
    fn generation_errors_hide_details() {
        let body = AppError::from(GenerationError::Docx("zip failure".into())).body();
        assert_eq!(body.error, "Failed to generate file.");
        assert!(body.details.is_none());
    }

    #[test]
    fn validation_errors_are_client_errors() {
        let too_large = AppError::FileTooLarge { limit_mb: 20 };
        assert_eq!(too_large.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(too_large.body().error, "File size is too large. Max limit is 20MB.");

        let bad_type = AppError::InvalidFileType {
            mime_type: "text/plain".into(),
        };
        assert_eq!(bad_type.status_code(), StatusCode::BAD_REQUEST);
        assert_ne!(bad_type.error_code(), too_large.error_code());
        assert_eq!(AppError::MissingText.status_code(), StatusCode::BAD_REQUEST);
    }
}
