use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Read, Seek};
use std::path::Path;

use crate::error::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Raw text of a DOCX file: every paragraph followed by a blank line.
pub fn extract_raw_text(path: &Path) -> Result<String, ExtractionError> {
    let file = std::fs::File::open(path)?;
    let paragraphs = read_paragraphs(file)?;

    Ok(paragraphs
        .iter()
        .map(|p| format!("{}\n\n", p))
        .collect())
}

/// Paragraph texts of the main document part, in document order.
pub fn read_paragraphs<R: Read + Seek>(reader: R) -> Result<Vec<String>, ExtractionError> {
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| ExtractionError::docx(format!("not a valid DOCX archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractionError::docx(format!("missing {}: {}", DOCUMENT_PART, e)))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::docx(format!("unreadable {}: {}", DOCUMENT_PART, e)))?;

    paragraphs_from_xml(&xml)
}

fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs = Vec::new();
    // Text boxes nest paragraphs inside runs of an outer paragraph
    let mut open: Vec<String> = Vec::new();
    let mut run_depth = 0usize;
    let mut in_text = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            ExtractionError::docx(format!(
                "malformed document XML at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"r" => run_depth += 1,
                b"t" if run_depth > 0 => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(done) = open.pop() {
                        paragraphs.push(done);
                    }
                }
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"p" => paragraphs.push(String::new()),
                    b"tab" if run_depth > 0 => push_text(&mut open, "\t"),
                    b"br" | b"cr" if run_depth > 0 => push_text(&mut open, "\n"),
                    _ => {}
                }
            }
            Event::Text(t) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractionError::docx(format!("bad text escape: {}", e)))?;
                push_text(&mut open, &text);
            }
            Event::CData(c) if in_text => {
                push_text(&mut open, &String::from_utf8_lossy(&c.into_inner()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !open.is_empty() {
        return Err(ExtractionError::docx("document XML ended inside a paragraph"));
    }

    Ok(paragraphs)
}

fn push_text(open: &mut [String], text: &str) {
    if let Some(current) = open.last_mut() {
        current.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const W: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    fn docx_with(document_xml: &str) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            zip.start_file(DOCUMENT_PART, zip::write::FileOptions::default())
                .unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn reads_paragraph_runs_tabs_and_breaks() {
        let xml = format!(
            r#"<w:document {W}><w:body>
<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p>
<w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c &amp; d</w:t></w:r></w:p>
<w:p/>
</w:body></w:document>"#
        );
        let paragraphs = read_paragraphs(Cursor::new(docx_with(&xml))).unwrap();
        assert_eq!(paragraphs, vec!["Hello world", "a\tb\nc & d", ""]);
    }

    #[test]
    fn ignores_deleted_and_field_text() {
        let xml = format!(
            r#"<w:document {W}><w:body><w:p><w:r><w:instrText>PAGE</w:instrText></w:r><w:del><w:r><w:delText>old</w:delText></w:r></w:del><w:r><w:t>new</w:t></w:r></w:p></w:body></w:document>"#
        );
        let paragraphs = read_paragraphs(Cursor::new(docx_with(&xml))).unwrap();
        assert_eq!(paragraphs, vec!["new"]);
    }

    #[test]
    fn raw_text_separates_paragraphs_with_blank_lines() {
        let xml = format!(
            r#"<w:document {W}><w:body><w:p><w:r><w:t>one</w:t></w:r></w:p><w:p><w:r><w:t>two</w:t></w:r></w:p></w:body></w:document>"#
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        std::fs::write(&path, docx_with(&xml)).unwrap();

        assert_eq!(extract_raw_text(&path).unwrap(), "one\n\ntwo\n\n");
    }

    #[test]
    fn rejects_non_zip_input() {
        let err = read_paragraphs(Cursor::new(b"plain text, not a zip".to_vec())).unwrap_err();
        assert!(matches!(err, ExtractionError::DocxParse { .. }));
    }

    #[test]
    fn rejects_archive_without_document_part() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            zip.start_file("other.xml", zip::write::FileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = read_paragraphs(Cursor::new(cursor.into_inner())).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn rejects_truncated_xml() {
        let xml = format!(r#"<w:document {W}><w:body><w:p><w:r><w:t>cut"#);
        let err = read_paragraphs(Cursor::new(docx_with(&xml))).unwrap_err();
        assert!(matches!(err, ExtractionError::DocxParse { .. }));
    }
}
