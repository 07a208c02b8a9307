use axum::{extract::State, response::Json};
use tracing::info;

use crate::models::{HealthResponse, ServiceAvailability};
use crate::state::AppState;

/// Reports whether the external OCR and rasterization tools can be run.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let extractor = state.extractor.clone();
    let (ocr, rasterizer) = tokio::task::spawn_blocking(move || {
        (extractor.ocr_available(), extractor.rasterizer_available())
    })
    .await
    .unwrap_or((false, false));

    let status = if ocr && rasterizer { "healthy" } else { "degraded" };

    info!(
        status = status,
        ocr_available = ocr,
        rasterizer_available = rasterizer,
        "Health check completed"
    );

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services: ServiceAvailability { ocr, rasterizer },
    })
}
