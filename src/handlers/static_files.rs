use axum::{
    handler::HandlerWithoutStateExt,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use tower::util::BoxCloneService;
use tower_http::services::ServeDir;
use tracing::warn;

use crate::models::ErrorBody;

pub const INDEX_FILE: &str = "index.html";

/// Unmatched routes under `/api` answer JSON instead of the frontend.
pub async fn api_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "API endpoint not found".to_string(),
            details: None,
        }),
    )
        .into_response()
}

/// Serves the built frontend from `dir`; paths that match no file get the
/// bundle's `index.html` so client-side routes resolve.
pub fn frontend_service(
    dir: &Path,
) -> ServeDir<BoxCloneService<axum::extract::Request, Response, Infallible>> {
    let index = dir.join(INDEX_FILE);
    let fallback = (move || spa_index(index.clone())).into_service();
    ServeDir::new(dir).fallback(BoxCloneService::new(fallback))
}

async fn spa_index(index: PathBuf) -> Response {
    match tokio::fs::read(&index).await {
        Ok(html) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            html,
        )
            .into_response(),
        Err(e) => {
            warn!(path = %index.display(), error = %e, "Frontend bundle missing");
            (
                StatusCode::NOT_FOUND,
                "Frontend build not found. Please check deployment logs.",
            )
                .into_response()
        }
    }
}
