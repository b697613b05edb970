//! Shopping list documents. The PDF writer emits a minimal PDF 1.4 file using the
//! built-in Helvetica font, so no font files are shipped.

use std::fmt::Write as _;

use crate::models::{ShoppingList, ShoppingListDocument, ShoppingListFormat};

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const LEFT_MARGIN: u32 = 100;
/// Distance from the top of the page to the first baseline
const TOP_OFFSET: u32 = 100;
const BOTTOM_MARGIN: u32 = 50;
const LINE_STEP: u32 = 15;
const TITLE_FONT_SIZE: u32 = 14;
const ITEM_FONT_SIZE: u32 = 12;

/// One line of text placed on a page, measured from the top edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedLine {
    pub font_size: u32,
    pub top: u32,
    pub text: String,
}

pub fn render(list: &ShoppingList, format: ShoppingListFormat) -> ShoppingListDocument {
    let body = match format {
        ShoppingListFormat::Pdf => render_pdf(list),
        ShoppingListFormat::Txt => render_text(list),
    };
    ShoppingListDocument { format, body }
}

/// Title line followed by one line per item, UTF-8
pub fn render_text(list: &ShoppingList) -> Vec<u8> {
    let mut text = String::from(ShoppingList::TITLE);
    text.push('\n');
    for line in list.lines() {
        text.push_str(&line);
        text.push('\n');
    }
    text.into_bytes()
}

/// Title on the first page, items below it 15pt apart, continuing on new
/// pages once the bottom margin is reached
pub fn layout_pages(list: &ShoppingList) -> Vec<Vec<PlacedLine>> {
    let mut pages = vec![vec![PlacedLine {
        font_size: TITLE_FONT_SIZE,
        top: TOP_OFFSET,
        text: ShoppingList::TITLE.to_string(),
    }]];
    let mut top = TOP_OFFSET + LINE_STEP;

    for line in list.lines() {
        if top > PAGE_HEIGHT - BOTTOM_MARGIN {
            pages.push(Vec::new());
            top = TOP_OFFSET;
        }
        if let Some(page) = pages.last_mut() {
            page.push(PlacedLine {
                font_size: ITEM_FONT_SIZE,
                top,
                text: line,
            });
        }
        top += LINE_STEP;
    }

    pages
}

/// Encode a string for a PDF literal in WinAnsi. Characters outside Latin-1
/// become `?`.
pub fn encode_pdf_text(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                bytes.push(b'\\');
                bytes.push(c as u8);
            }
            ' '..='~' => bytes.push(c as u8),
            '\u{A0}'..='\u{FF}' => bytes.push(c as u32 as u8),
            _ => bytes.push(b'?'),
        }
    }
    bytes
}

fn content_stream(lines: &[PlacedLine]) -> Vec<u8> {
    let mut stream = Vec::new();
    for line in lines {
        let y = PAGE_HEIGHT - line.top;
        stream.extend_from_slice(
            format!("BT /F1 {} Tf {} {} Td (", line.font_size, LEFT_MARGIN, y).as_bytes(),
        );
        stream.extend_from_slice(&encode_pdf_text(&line.text));
        stream.extend_from_slice(b") Tj ET\n");
    }
    stream
}

pub fn render_pdf(list: &ShoppingList) -> Vec<u8> {
    let pages = layout_pages(list);

    // 1 catalog, 2 page tree, 3 font, then a page object and its content stream per page
    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(3 + pages.len() * 2);
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());

    let kids = (0..pages.len())
        .map(|index| format!("{} 0 R", 4 + index * 2))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, pages.len()).into_bytes());
    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );

    for (index, page) in pages.iter().enumerate() {
        let contents_id = 5 + index * 2;
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH, PAGE_HEIGHT, contents_id
            )
            .into_bytes(),
        );

        let stream = content_stream(page);
        let mut object = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
        object.extend_from_slice(&stream);
        object.extend_from_slice(b"\nendstream");
        objects.push(object);
    }

    let mut pdf = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        pdf.extend_from_slice(object);
        pdf.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = writeln!(xref, "{:010} 00000 n ", offset);
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    );
    pdf.extend_from_slice(xref.as_bytes());

    pdf
}
