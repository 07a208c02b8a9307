use std::env;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub max_file_size_mb: usize,
    pub max_download_body_mb: usize,
    pub request_timeout_seconds: u64,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub ocr_language: String,
    pub tesseract_bin: String,
    pub pdftoppm_bin: String,
    pub pdf_render_scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// `LOG_FORMAT=json` selects JSON lines; anything else is human readable.
    /// Read on its own because logging is set up before `Config` loads.
    pub fn from_env() -> Self {
        match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3001,
            max_file_size_mb: 20,
            max_download_body_mb: 50,
            request_timeout_seconds: 300,
            upload_dir: PathBuf::from("uploads"),
            static_dir: PathBuf::from("dist"),
            ocr_language: "eng".to_string(),
            tesseract_bin: "tesseract".to_string(),
            pdftoppm_bin: "pdftoppm".to_string(),
            pdf_render_scale: 2.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");
        let defaults = Config::default();

        // PORT wins over SERVER_PORT for hosted deployments
        let port_var = if env::var("PORT").is_ok() { "PORT" } else { "SERVER_PORT" };

        let config = Config {
            server_host: Self::string_var("SERVER_HOST", &defaults.server_host),
            server_port: Self::parse_env_var(port_var, defaults.server_port)
                .context("Failed to parse server port")?,
            max_file_size_mb: Self::parse_env_var("MAX_FILE_SIZE_MB", defaults.max_file_size_mb)
                .context("Failed to parse MAX_FILE_SIZE_MB")?,
            max_download_body_mb: Self::parse_env_var(
                "MAX_DOWNLOAD_BODY_MB",
                defaults.max_download_body_mb,
            )
            .context("Failed to parse MAX_DOWNLOAD_BODY_MB")?,
            request_timeout_seconds: Self::parse_env_var(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            )
            .context("Failed to parse REQUEST_TIMEOUT_SECONDS")?,
            upload_dir: PathBuf::from(Self::string_var(
                "UPLOAD_DIR",
                &defaults.upload_dir.to_string_lossy(),
            )),
            static_dir: PathBuf::from(Self::string_var(
                "STATIC_DIR",
                &defaults.static_dir.to_string_lossy(),
            )),
            ocr_language: Self::string_var("OCR_LANGUAGE", &defaults.ocr_language),
            tesseract_bin: Self::string_var("TESSERACT_BIN", &defaults.tesseract_bin),
            pdftoppm_bin: Self::string_var("PDFTOPPM_BIN", &defaults.pdftoppm_bin),
            pdf_render_scale: Self::parse_env_var("PDF_RENDER_SCALE", defaults.pdf_render_scale)
                .context("Failed to parse PDF_RENDER_SCALE")?,
        };

        config.validate()?;

        info!("Configuration loaded successfully: {:?}", config);
        Ok(config)
    }

    fn string_var(var_name: &str, default: &str) -> String {
        match env::var(var_name) {
            Ok(val) if !val.trim().is_empty() => val,
            _ => {
                info!("{} not set, using default: {}", var_name, default);
                default.to_string()
            }
        }
    }

    fn parse_env_var<T>(var_name: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr + Copy + std::fmt::Debug,
        T::Err: std::fmt::Display,
    {
        match env::var(var_name) {
            Ok(val) => match val.trim().parse() {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {} (using default: {:?})", var_name, e, default);
                    Ok(default)
                }
            },
            Err(_) => {
                info!("{} not set, using default: {:?}", var_name, default);
                Ok(default)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            return Err(anyhow::anyhow!("SERVER_PORT must be greater than 0"));
        }
        if self.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.max_download_body_mb == 0 {
            return Err(anyhow::anyhow!("MAX_DOWNLOAD_BODY_MB must be greater than 0"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("REQUEST_TIMEOUT_SECONDS must be greater than 0"));
        }
        if !(self.pdf_render_scale.is_finite() && self.pdf_render_scale > 0.0) {
            return Err(anyhow::anyhow!("PDF_RENDER_SCALE must be a positive number"));
        }
        if self.ocr_language.is_empty() {
            return Err(anyhow::anyhow!("OCR_LANGUAGE must not be empty"));
        }
        Ok(())
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Rasterization resolution; PDF user space is 72 units per inch.
    pub fn pdf_render_dpi(&self) -> u32 {
        (72.0 * self.pdf_render_scale).round() as u32
    }
}
