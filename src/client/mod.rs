//! Programmatic counterpart of the browser frontend: drives a
//! [`ClientSession`] against a running extractor over HTTP.

pub mod session;

pub use session::*;

use reqwest::multipart::{Form, Part};
use reqwest::{header, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{DownloadFormat, ErrorBody, ExtractionResult};

const FALLBACK_ERROR: &str = "Failed to extract text";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("{} export is rendered by the browser, not the server", .format.extension())]
    BrowserOnly { format: DownloadFormat },
}

#[derive(Serialize)]
struct DownloadPayload<'a> {
    text: &'a str,
    format: DownloadFormat,
}

/// Message shown for a non-2xx response.
///
/// JSON bodies carry their own `error`; anything else (an HTML 404 from a
/// proxy, a crashed backend) means the API itself could not be reached.
pub fn interpret_failure(status: u16, content_type: Option<&str>, body: &[u8]) -> String {
    let is_json = content_type
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);

    if !is_json {
        return format!(
            "Server connection failed ({}). Please check if the backend is running.",
            status
        );
    }

    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(body) if !body.error.is_empty() => body.error,
        _ => FALLBACK_ERROR.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct ExtractorClient {
    http: reqwest::Client,
    base_url: String,
}

impl ExtractorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Upload the session's selected file and record the outcome on the
    /// session. Only a session-state violation is returned as `Err`; request
    /// failures end in the `error` status with a displayable message.
    pub async fn extract(&self, session: &mut ClientSession) -> Result<(), ClientError> {
        let file = session.begin_upload()?.clone();

        let part = match Part::bytes(file.content)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
        {
            Ok(part) => part,
            Err(e) => {
                session.fail(e.to_string())?;
                return Ok(());
            }
        };
        let form = Form::new().part("file", part);

        session.begin_processing()?;
        debug!(file = %file.name, "Uploading file for extraction");

        match self.send_extract(form).await {
            Ok(result) => session.complete(result)?,
            Err(e) => {
                warn!(file = %file.name, error = %e, "Extraction failed");
                session.fail(e.to_string())?;
            }
        }
        Ok(())
    }

    async fn send_extract(&self, form: Form) -> Result<ExtractionResult, ClientError> {
        let response = self
            .http
            .post(self.url("/api/extract"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        Ok(response.json::<ExtractionResult>().await?)
    }

    /// Bytes of the exported file. TXT is produced locally; PDF and DOCX come
    /// from the server.
    pub async fn download(&self, text: &str, format: DownloadFormat) -> Result<Vec<u8>, ClientError> {
        match format {
            DownloadFormat::Txt => Ok(text.as_bytes().to_vec()),
            DownloadFormat::Png | DownloadFormat::Jpeg => Err(ClientError::BrowserOnly { format }),
            DownloadFormat::Pdf | DownloadFormat::Docx => {
                let response = self
                    .http
                    .post(self.url("/api/download"))
                    .json(&DownloadPayload { text, format })
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(Self::failure(response).await);
                }
                Ok(response.bytes().await?.to_vec())
            }
        }
    }

    async fn failure(response: reqwest::Response) -> ClientError {
        let status: StatusCode = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.unwrap_or_default();

        ClientError::Server {
            status: status.as_u16(),
            message: interpret_failure(status.as_u16(), content_type.as_deref(), &body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_failures_surface_the_server_message() {
        let body = br#"{"error":"File size is too large. Max limit is 20MB."}"#;
        assert_eq!(
            interpret_failure(400, Some("application/json"), body),
            "File size is too large. Max limit is 20MB."
        );
    }

    #[test]
    fn json_failures_without_error_field_use_fallback() {
        assert_eq!(
            interpret_failure(500, Some("application/json; charset=utf-8"), b"{}"),
            FALLBACK_ERROR
        );
        assert_eq!(
            interpret_failure(500, Some("application/json"), b"not json"),
            FALLBACK_ERROR
        );
    }

    #[test]
    fn non_json_failures_report_connection_problem() {
        assert_eq!(
            interpret_failure(502, Some("text/html"), b"<html>Bad Gateway</html>"),
            "Server connection failed (502). Please check if the backend is running."
        );
        assert_eq!(
            interpret_failure(404, None, b""),
            "Server connection failed (404). Please check if the backend is running."
        );
    }

    #[tokio::test]
    async fn txt_and_image_exports_stay_local() {
        // Nothing listens here; neither call may touch the network
        let client = ExtractorClient::new("http://127.0.0.1:9/");

        let bytes = client.download("a\r\nb", DownloadFormat::Txt).await.unwrap();
        assert_eq!(bytes, b"a\r\nb");

        let err = client.download("a", DownloadFormat::Png).await.unwrap_err();
        assert!(matches!(err, ClientError::BrowserOnly { format: DownloadFormat::Png }));
    }
}
