//! Plain text to PDF, written incrementally.
//!
//! Each page is laid out, encoded and written to the sink before the next one
//! is started, so the whole document never exists in memory. Only the byte
//! offsets needed for the cross-reference table are kept.

use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};
use std::io::Write;

use crate::error::GenerationError;

const CATALOG_ID: u32 = 1;
const PAGES_ID: u32 = 2;
const FONT_ID: u32 = 3;
const FIRST_PAGE_ID: u32 = 4;

/// Page geometry and type settings, in PDF points.
#[derive(Debug, Clone, Copy)]
pub struct PdfLayout {
    pub page_width: i64,
    pub page_height: i64,
    pub margin: i64,
    pub font_size: i64,
    /// Baseline-to-baseline distance: font line height plus a 2pt gap.
    pub leading: i64,
}

impl Default for PdfLayout {
    fn default() -> Self {
        Self {
            page_width: 612,
            page_height: 792,
            margin: 72,
            font_size: 12,
            leading: 16,
        }
    }
}

impl PdfLayout {
    fn text_width(&self) -> f32 {
        (self.page_width - 2 * self.margin) as f32
    }

    fn lines_per_page(&self) -> usize {
        (((self.page_height - 2 * self.margin) / self.leading).max(1)) as usize
    }

    fn first_baseline(&self) -> i64 {
        self.page_height - self.margin - self.font_size
    }
}

/// Render `text` as a PDF into `sink`. Returns the number of bytes written.
pub fn write_pdf<W: Write>(text: &str, sink: W) -> Result<u64, GenerationError> {
    write_pdf_with_layout(text, sink, PdfLayout::default())
}

pub fn write_pdf_with_layout<W: Write>(
    text: &str,
    sink: W,
    layout: PdfLayout,
) -> Result<u64, GenerationError> {
    let mut writer = ObjectWriter::new(sink);
    writer.write_raw(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n")?;

    writer.begin_object(FONT_ID)?;
    writer.write_raw(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    )?;
    writer.end_object()?;

    let per_page = layout.lines_per_page();
    let max_width = layout.text_width();
    let mut page_ids = Vec::new();
    let mut next_id = FIRST_PAGE_ID;
    let mut page_lines: Vec<Vec<u8>> = Vec::with_capacity(per_page);

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        for visual in wrap_line(&encode_win_ansi(line), max_width, layout.font_size as f32) {
            page_lines.push(visual);
            if page_lines.len() == per_page {
                page_ids.push(writer.write_page(&page_lines, next_id, &layout)?);
                next_id += 2;
                page_lines.clear();
            }
        }
    }
    if !page_lines.is_empty() || page_ids.is_empty() {
        page_ids.push(writer.write_page(&page_lines, next_id, &layout)?);
    }

    let kids = page_ids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");
    writer.begin_object(PAGES_ID)?;
    writer.write_raw(
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, page_ids.len()).as_bytes(),
    )?;
    writer.end_object()?;

    writer.begin_object(CATALOG_ID)?;
    writer.write_raw(format!("<< /Type /Catalog /Pages {} 0 R >>", PAGES_ID).as_bytes())?;
    writer.end_object()?;

    writer.finish()
}

struct ObjectWriter<W: Write> {
    sink: W,
    offset: u64,
    xref: Vec<(u32, u64)>,
}

impl<W: Write> ObjectWriter<W> {
    fn new(sink: W) -> Self {
        Self {
            sink,
            offset: 0,
            xref: Vec::new(),
        }
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), GenerationError> {
        self.sink.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    fn begin_object(&mut self, id: u32) -> Result<(), GenerationError> {
        self.xref.push((id, self.offset));
        self.write_raw(format!("{} 0 obj\n", id).as_bytes())
    }

    fn end_object(&mut self) -> Result<(), GenerationError> {
        self.write_raw(b"\nendobj\n")
    }

    /// Writes the content stream as `id` and the page dictionary as `id + 1`,
    /// returning the page id.
    fn write_page(
        &mut self,
        lines: &[Vec<u8>],
        id: u32,
        layout: &PdfLayout,
    ) -> Result<u32, GenerationError> {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(layout.font_size)],
            ),
            Operation::new("TL", vec![Object::Integer(layout.leading)]),
            Operation::new(
                "Td",
                vec![
                    Object::Integer(layout.margin),
                    Object::Integer(layout.first_baseline()),
                ],
            ),
        ];
        for line in lines {
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(line.clone(), StringFormat::Literal)],
            ));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let stream = Content { operations }
            .encode()
            .map_err(|e| GenerationError::Pdf(format!("failed to encode page content: {}", e)))?;

        self.begin_object(id)?;
        self.write_raw(format!("<< /Length {} >>\nstream\n", stream.len()).as_bytes())?;
        self.write_raw(&stream)?;
        self.write_raw(b"\nendstream")?;
        self.end_object()?;

        let page_id = id + 1;
        self.begin_object(page_id)?;
        self.write_raw(
            format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 {} 0 R >> >> /Contents {} 0 R >>",
                PAGES_ID, layout.page_width, layout.page_height, FONT_ID, id
            )
            .as_bytes(),
        )?;
        self.end_object()?;

        Ok(page_id)
    }

    fn finish(mut self) -> Result<u64, GenerationError> {
        self.xref.sort_by_key(|(id, _)| *id);
        let size = self.xref.len() + 1;
        let xref_offset = self.offset;

        let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", size);
        for (_, offset) in &self.xref {
            table.push_str(&format!("{:010} 00000 n \n", offset));
        }
        table.push_str(&format!(
            "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, CATALOG_ID, xref_offset
        ));
        self.write_raw(table.as_bytes())?;
        self.sink.flush()?;
        Ok(self.offset)
    }
}

/// Map text to the WinAnsi code page used by the standard Helvetica font.
/// Tabs expand to four spaces; anything unrepresentable becomes `?`.
fn encode_win_ansi(line: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '\t' => out.extend_from_slice(b"    "),
            ' '..='~' => out.push(c as u8),
            '\u{A0}'..='\u{FF}' => out.push(c as u32 as u8),
            '€' => out.push(0x80),
            '‚' => out.push(0x82),
            '„' => out.push(0x84),
            '…' => out.push(0x85),
            '‘' => out.push(0x91),
            '’' => out.push(0x92),
            '“' => out.push(0x93),
            '”' => out.push(0x94),
            '•' => out.push(0x95),
            '–' => out.push(0x96),
            '—' => out.push(0x97),
            '™' => out.push(0x99),
            c if c.is_control() => {}
            _ => out.push(b'?'),
        }
    }
    out
}

/// Helvetica advance widths for 0x20..=0x7E, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // space../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // {..~
];

fn glyph_width(byte: u8, font_size: f32) -> f32 {
    let units = match byte {
        0x20..=0x7E => HELVETICA_WIDTHS[(byte - 0x20) as usize],
        _ => 556,
    };
    units as f32 * font_size / 1000.0
}

fn text_width(bytes: &[u8], font_size: f32) -> f32 {
    bytes.iter().map(|b| glyph_width(*b, font_size)).sum()
}

/// Break one input line into visual lines no wider than `max_width`,
/// preferring word boundaries. An empty line stays one empty visual line.
fn wrap_line(line: &[u8], max_width: f32, font_size: f32) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut current: Vec<u8> = Vec::new();
    let mut width = 0.0f32;

    for word in line.split_inclusive(|b| *b == b' ') {
        let visible = trim_end_spaces(word);
        let visible_width = text_width(visible, font_size);

        if !current.is_empty() && width + visible_width > max_width {
            lines.push(trim_end_spaces(&current).to_vec());
            current.clear();
            width = 0.0;
        }

        if current.is_empty() && visible_width > max_width {
            // A single word wider than the line: break it by glyph
            for byte in word {
                let w = glyph_width(*byte, font_size);
                if !current.is_empty() && width + w > max_width {
                    lines.push(std::mem::take(&mut current));
                    width = 0.0;
                }
                current.push(*byte);
                width += w;
            }
            continue;
        }

        current.extend_from_slice(word);
        width += text_width(word, font_size);
    }

    lines.push(trim_end_spaces(&current).to_vec());
    lines
}

fn trim_end_spaces(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| *b != b' ')
        .map(|i| i + 1)
        .unwrap_or(0);
    &bytes[..end]
}
