pub mod download;
pub mod extract;
pub mod health;
pub mod static_files;

pub use download::*;
pub use extract::*;
pub use health::*;
pub use static_files::*;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::logging_middleware;
use crate::state::AppState;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// The complete application: API routes, health check and the frontend
/// bundle for everything else.
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let api = Router::new()
        .route(
            "/extract",
            post(extract_handler)
                .fallback(api_not_found)
                .layer(DefaultBodyLimit::max(
                    config.max_file_size_bytes() + MULTIPART_OVERHEAD_BYTES,
                )),
        )
        .route(
            "/download",
            post(download_handler)
                .fallback(api_not_found)
                .layer(DefaultBodyLimit::max(config.max_download_body_mb * 1024 * 1024)),
        )
        .fallback(api_not_found);

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        .fallback_service(frontend_service(&config.static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(axum::middleware::from_fn(logging_middleware)),
        )
        .with_state(state)
}
