use docx_rs::{Docx, LineSpacing, Paragraph, Run, RunFonts};
use std::io::Cursor;

use crate::error::GenerationError;

const FONT: &str = "Calibri";
/// Half-points: 12pt.
const FONT_SIZE: usize = 24;
/// Twips after each paragraph.
const SPACING_AFTER: u32 = 120;

/// One paragraph per input line. DOCX is a zip container, so the document is
/// built in full before it can be sent.
pub fn build_docx(text: &str) -> Result<Vec<u8>, GenerationError> {
    let docx = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .fold(Docx::new(), |docx, line| docx.add_paragraph(paragraph(line)));

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| GenerationError::Docx(e.to_string()))?;

    Ok(cursor.into_inner())
}

fn paragraph(line: &str) -> Paragraph {
    let run = Run::new()
        .add_text(line)
        .size(FONT_SIZE)
        .fonts(RunFonts::new().ascii(FONT).hi_ansi(FONT).cs(FONT));

    Paragraph::new()
        .add_run(run)
        .line_spacing(LineSpacing::new().after(SPACING_AFTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::docx_reader::read_paragraphs;

    #[test]
    fn each_line_becomes_a_paragraph() {
        let bytes = build_docx("line1\nline2").unwrap();
        let paragraphs = read_paragraphs(Cursor::new(bytes)).unwrap();
        assert_eq!(paragraphs, vec!["line1", "line2"]);
    }

    #[test]
    fn keeps_blank_lines_and_markup_characters() {
        let bytes = build_docx("a < b & c\r\n\n  indented").unwrap();
        let paragraphs = read_paragraphs(Cursor::new(bytes)).unwrap();
        assert_eq!(paragraphs, vec!["a < b & c", "", "  indented"]);
    }
}
