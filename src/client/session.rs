use std::fmt;
use thiserror::Error;

use crate::models::ExtractionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStatus {
    Idle,
    Selected,
    Uploading,
    Processing,
    Success,
    Error,
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionStatus::Idle => "idle",
            ExtractionStatus::Selected => "selected",
            ExtractionStatus::Uploading => "uploading",
            ExtractionStatus::Processing => "processing",
            ExtractionStatus::Success => "success",
            ExtractionStatus::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: ExtractionStatus,
        action: &'static str,
    },
}

/// A file picked by the user, held in memory until it is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content,
        }
    }
}

/// Client-side view of one extraction.
///
/// `idle → selected → uploading → processing → success | error`. Success and
/// error only leave through `reset`; a selected file can be dropped with
/// `change_file`. Rejected transitions leave the session untouched.
#[derive(Debug, Clone)]
pub struct ClientSession {
    status: ExtractionStatus,
    file: Option<SelectedFile>,
    result: Option<ExtractionResult>,
    error: Option<String>,
    editable_text: String,
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSession {
    pub fn new() -> Self {
        Self {
            status: ExtractionStatus::Idle,
            file: None,
            result: None,
            error: None,
            editable_text: String::new(),
        }
    }

    pub fn status(&self) -> ExtractionStatus {
        self.status
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn result(&self) -> Option<&ExtractionResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn editable_text(&self) -> &str {
        &self.editable_text
    }

    /// Picking a file is possible from the drop zone, i.e. while idle or
    /// when another file is already selected.
    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), SessionError> {
        self.require(
            &[ExtractionStatus::Idle, ExtractionStatus::Selected],
            "select a file",
        )?;
        self.file = Some(file);
        self.result = None;
        self.error = None;
        self.editable_text.clear();
        self.status = ExtractionStatus::Selected;
        Ok(())
    }

    pub fn change_file(&mut self) -> Result<(), SessionError> {
        self.require(&[ExtractionStatus::Selected], "change the file")?;
        self.clear();
        Ok(())
    }

    pub fn begin_upload(&mut self) -> Result<&SelectedFile, SessionError> {
        self.require(&[ExtractionStatus::Selected], "start an upload")?;
        let file = self.file.as_ref().ok_or(SessionError::InvalidTransition {
            from: self.status,
            action: "start an upload",
        })?;
        self.error = None;
        self.status = ExtractionStatus::Uploading;
        Ok(file)
    }

    pub fn begin_processing(&mut self) -> Result<(), SessionError> {
        self.require(&[ExtractionStatus::Uploading], "start processing")?;
        self.status = ExtractionStatus::Processing;
        Ok(())
    }

    pub fn complete(&mut self, result: ExtractionResult) -> Result<(), SessionError> {
        self.require(&[ExtractionStatus::Processing], "complete")?;
        self.editable_text = result.combined_text();
        self.result = Some(result);
        self.status = ExtractionStatus::Success;
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), SessionError> {
        self.require(
            &[ExtractionStatus::Uploading, ExtractionStatus::Processing],
            "fail",
        )?;
        self.error = Some(message.into());
        self.status = ExtractionStatus::Error;
        Ok(())
    }

    /// Back to idle from anywhere, discarding file, result and error.
    pub fn reset(&mut self) {
        self.clear();
    }

    pub fn set_editable_text(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.require(&[ExtractionStatus::Success], "edit the text")?;
        self.editable_text = text.into();
        Ok(())
    }

    /// TXT export: the editable text exactly as shown.
    pub fn export_txt(&self) -> Vec<u8> {
        self.editable_text.as_bytes().to_vec()
    }

    fn require(
        &self,
        allowed: &[ExtractionStatus],
        action: &'static str,
    ) -> Result<(), SessionError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: self.status,
                action,
            })
        }
    }

    fn clear(&mut self) {
        *self = Self::new();
    }
}
