use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// The upload types the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Jpeg,
    Png,
    Pdf,
    Docx,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::Jpeg,
        DocumentKind::Png,
        DocumentKind::Pdf,
        DocumentKind::Docx,
    ];

    /// Exact match against the allow-list; parameters such as `; charset=`
    /// are ignored.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        Self::ALL.into_iter().find(|kind| kind.mime_type() == essence)
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentKind::Jpeg => "image/jpeg",
            DocumentKind::Png => "image/png",
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Docx => DOCX_MIME_TYPE,
        }
    }

    pub fn default_extension(&self) -> &'static str {
        match self {
            DocumentKind::Jpeg => "jpg",
            DocumentKind::Png => "png",
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// An upload persisted to the upload directory for the duration of one
/// request. Dropping the value deletes the file.
#[derive(Debug)]
pub struct UploadedFile {
    path: PathBuf,
    original_name: String,
    kind: DocumentKind,
    size: usize,
}

impl UploadedFile {
    /// Reserve a collision-resistant path inside `dir`. Nothing is written
    /// yet, but the guard already owns the path, so a partially written
    /// upload is removed as well.
    pub fn reserve(dir: &Path, original_name: &str, kind: DocumentKind) -> Self {
        let path = dir.join(Self::temp_name(original_name, kind));
        Self {
            path,
            original_name: original_name.to_string(),
            kind,
            size: 0,
        }
    }

    /// `<unix-millis>-<uuid>.<ext>`, keeping the original extension when it
    /// is a plain alphanumeric one.
    pub fn temp_name(original_name: &str, kind: DocumentKind) -> String {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| {
                !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| kind.default_extension().to_string());

        format!(
            "{}-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn add_written(&mut self, bytes: usize) -> usize {
        self.size += bytes;
        self.size
    }
}

impl Drop for UploadedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Deleted uploaded file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to delete uploaded file"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    Txt,
    Pdf,
    Docx,
    Png,
    Jpeg,
}

impl DownloadFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "txt" => Some(DownloadFormat::Txt),
            "pdf" => Some(DownloadFormat::Pdf),
            "docx" => Some(DownloadFormat::Docx),
            "png" => Some(DownloadFormat::Png),
            "jpeg" => Some(DownloadFormat::Jpeg),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DownloadFormat::Txt => "txt",
            DownloadFormat::Pdf => "pdf",
            DownloadFormat::Docx => "docx",
            DownloadFormat::Png => "png",
            DownloadFormat::Jpeg => "jpeg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            DownloadFormat::Txt => "text/plain",
            DownloadFormat::Pdf => "application/pdf",
            DownloadFormat::Docx => DOCX_MIME_TYPE,
            DownloadFormat::Png => "image/png",
            DownloadFormat::Jpeg => "image/jpeg",
        }
    }

    /// Only PDF and DOCX are generated by the service.
    pub fn is_server_side(&self) -> bool {
        matches!(self, DownloadFormat::Pdf | DownloadFormat::Docx)
    }

    pub fn file_name(&self) -> String {
        format!("extracted_text.{}", self.extension())
    }
}

/// Body of `POST /api/download`. Both fields are optional at the wire level
/// so that a missing value becomes a validation error instead of a JSON
/// rejection.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DownloadRequest {
    pub text: Option<String>,
    pub format: Option<String>,
}
