use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub page: u32,
    pub text: String,
}

impl PageText {
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMeta {
    pub file_type: String,
    pub page_count: usize,
    pub processing_time_ms: u64,
}

/// Response of `POST /api/extract`.
///
/// `meta.page_count` always equals `pages.len()`; payloads that disagree are
/// rejected when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawExtractionResult")]
pub struct ExtractionResult {
    pages: Vec<PageText>,
    meta: ExtractionMeta,
}

#[derive(Deserialize)]
struct RawExtractionResult {
    pages: Vec<PageText>,
    meta: ExtractionMeta,
}

impl TryFrom<RawExtractionResult> for ExtractionResult {
    type Error = String;

    fn try_from(raw: RawExtractionResult) -> Result<Self, Self::Error> {
        if raw.meta.page_count != raw.pages.len() {
            return Err(format!(
                "pageCount {} does not match {} pages",
                raw.meta.page_count,
                raw.pages.len()
            ));
        }
        Ok(Self {
            pages: raw.pages,
            meta: raw.meta,
        })
    }
}

impl ExtractionResult {
    pub fn new(pages: Vec<PageText>, file_type: impl Into<String>, processing_time_ms: u64) -> Self {
        let page_count = pages.len();
        Self {
            pages,
            meta: ExtractionMeta {
                file_type: file_type.into(),
                page_count,
                processing_time_ms,
            },
        }
    }

    pub fn pages(&self) -> &[PageText] {
        &self.pages
    }

    pub fn meta(&self) -> &ExtractionMeta {
        &self.meta
    }

    /// The text presented for editing: each page under a `--- Page N ---`
    /// header, pages separated by a blank line.
    pub fn combined_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| format!("--- Page {} ---\n{}", p.page, p.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceAvailability,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceAvailability {
    pub ocr: bool,
    pub rasterizer: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_meta() {
        let result = ExtractionResult::new(vec![PageText::new(1, "")], "image/jpeg", 12);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["pages"][0]["page"], 1);
        assert_eq!(json["pages"][0]["text"], "");
        assert_eq!(json["meta"]["fileType"], "image/jpeg");
        assert_eq!(json["meta"]["pageCount"], 1);
        assert_eq!(json["meta"]["processingTimeMs"], 12);
    }

    #[test]
    fn rejects_mismatched_page_count() {
        let json = r#"{"pages":[{"page":1,"text":"a"}],"meta":{"fileType":"application/pdf","pageCount":2,"processingTimeMs":5}}"#;
        assert!(serde_json::from_str::<ExtractionResult>(json).is_err());

        let json = r#"{"pages":[],"meta":{"fileType":"application/pdf","pageCount":0,"processingTimeMs":5}}"#;
        let result: ExtractionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.meta().page_count, 0);
    }

    #[test]
    fn combined_text_labels_pages() {
        let result = ExtractionResult::new(
            vec![PageText::new(1, "first"), PageText::new(2, "second\nline")],
            "application/pdf",
            0,
        );
        assert_eq!(
            result.combined_text(),
            "--- Page 1 ---\nfirst\n\n--- Page 2 ---\nsecond\nline"
        );
    }

    #[test]
    fn error_body_omits_empty_details() {
        let body = ErrorBody {
            error: "API endpoint not found".into(),
            details: None,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"error":"API endpoint not found"}"#
        );
    }
}
