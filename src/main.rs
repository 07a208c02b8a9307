use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocr_extractor::config::{Config, LogFormat};
use ocr_extractor::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env()?;

    tracing::info!("Starting OCR extractor service");
    tracing::info!("Max file size: {}MB", config.max_file_size_mb);
    tracing::info!("Uploads directory: {}", config.upload_dir.display());
    tracing::info!("Serving frontend from: {}", config.static_dir.display());

    std::fs::create_dir_all(&config.upload_dir).with_context(|| {
        format!("Failed to create upload directory {}", config.upload_dir.display())
    })?;

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::from_config(config);

    if !state.extractor.ocr_available() {
        tracing::warn!(
            "{} not found; image and PDF extraction will fail",
            state.extractor.ocr_name()
        );
    }
    if !state.extractor.rasterizer_available() {
        tracing::warn!(
            "{} not found; PDF extraction will fail",
            state.extractor.rasterizer_name()
        );
    }

    let app = create_router(state);

    tracing::info!("Server listening on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ocr_extractor=debug,tower_http=debug,axum::rejection=trace".into());

    // Logging starts before Config so its own load is traced
    let registry = tracing_subscriber::registry().with(filter);
    match LogFormat::from_env() {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init(),
    }
}
