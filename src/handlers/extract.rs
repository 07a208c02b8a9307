use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::Json,
};
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{DocumentKind, ExtractionResult, UploadedFile};
use crate::state::AppState;

const FILE_FIELD: &str = "file";

pub async fn extract_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ExtractionResult>> {
    let start = Instant::now();
    info!("Starting extraction request");

    let mut multipart = multipart.map_err(|e| {
        warn!(error = %e, "Request is not a multipart upload");
        AppError::MissingFile
    })?;

    // Owns the stored file until this function returns, on every path
    let upload = receive_upload(&mut multipart, &state.config).await?;

    info!(
        file_name = %upload.original_name(),
        file_size = upload.size(),
        mime_type = %upload.kind(),
        "File received"
    );

    let extraction = state.extractor.extract(upload.path(), upload.kind());
    let pages = match tokio::time::timeout(state.config.request_timeout(), extraction).await {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            error!(error = %e, "Extraction failed");
            return Err(e.into());
        }
        Err(elapsed) => {
            error!(
                timeout_seconds = state.config.request_timeout_seconds,
                "Extraction timed out"
            );
            return Err(elapsed.into());
        }
    };

    let processing_time_ms = start.elapsed().as_millis() as u64;
    let result = ExtractionResult::new(pages, upload.kind().mime_type(), processing_time_ms);

    info!(
        page_count = result.meta().page_count,
        processing_time_ms,
        "Request completed successfully"
    );

    Ok(Json(result))
}

/// Stream the `file` field to the upload directory, enforcing the type
/// allow-list before anything is written and the size limit while writing.
async fn receive_upload(multipart: &mut Multipart, config: &Config) -> AppResult<UploadedFile> {
    let limit = config.max_file_size_bytes();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, config))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field.content_type().unwrap_or("").to_string();
        let kind = DocumentKind::from_mime(&mime_type).ok_or_else(|| {
            warn!(file_name = %original_name, mime_type = %mime_type, "Rejected file type");
            AppError::InvalidFileType {
                mime_type: mime_type.clone(),
            }
        })?;

        let mut upload = UploadedFile::reserve(&config.upload_dir, &original_name, kind);
        let mut file = tokio::fs::File::create(upload.path()).await?;

        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, config))? {
            if upload.add_written(chunk.len()) > limit {
                warn!(
                    file_name = %original_name,
                    max_size = limit,
                    "File size exceeds limit"
                );
                return Err(AppError::FileTooLarge {
                    limit_mb: config.max_file_size_mb,
                });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!(
            path = %upload.path().display(),
            size = upload.size(),
            "Upload stored"
        );
        return Ok(upload);
    }

    Err(AppError::MissingFile)
}

fn multipart_error(err: MultipartError, config: &Config) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge {
            limit_mb: config.max_file_size_mb,
        }
    } else {
        AppError::invalid_file(format!("Failed to read multipart data: {}", err.body_text()))
    }
}
