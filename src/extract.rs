//! Text extraction for uploaded documents (PDF, DOCX, plain text, markdown).
//!
//! Callers supply a path or bytes plus the declared [`FileType`]; this module
//! returns plain UTF-8 text. Nothing here falls back silently: any I/O or
//! parse failure is returned so the upload can be rejected.
//!
//! | Type | Output |
//! |------|--------|
//! | PDF | page texts in page order, each followed by `\n` |
//! | DOCX | paragraph texts in document order, each followed by `\n` |
//! | TXT / MD | file contents verbatim |

use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::models::FileType;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const DOCX_BODY: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
    #[error("file is not valid UTF-8: {0}")]
    Encoding(String),
}

/// Extract text from a file given a declared type tag such as `"pdf"`.
pub fn extract_file(path: &Path, type_tag: &str) -> Result<String, ExtractError> {
    let file_type = FileType::from_extension(type_tag)
        .map_err(|_| ExtractError::UnsupportedFormat(type_tag.to_string()))?;
    extract_path(path, file_type)
}

/// Extract text from a file of a known type.
pub fn extract_path(path: &Path, file_type: FileType) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)?;
    extract_bytes(&bytes, file_type)
}

/// Extract text from in-memory file content.
pub fn extract_bytes(bytes: &[u8], file_type: FileType) -> Result<String, ExtractError> {
    match file_type {
        FileType::Pdf => extract_pdf(bytes),
        FileType::Docx => extract_docx(bytes),
        FileType::Txt | FileType::Md => String::from_utf8(bytes.to_vec())
            .map_err(|e| ExtractError::Encoding(e.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let mut out = String::new();
    for page in pages {
        out.push_str(&page);
        out.push('\n');
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name(DOCX_BODY)
        .map_err(|_| ExtractError::Docx(format!("{} not found", DOCX_BODY)))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(format!(
            "{} exceeds size limit ({} bytes)",
            DOCX_BODY, MAX_XML_ENTRY_BYTES
        )));
    }

    docx_paragraphs(&xml)
}

/// Collect `<w:t>` runs per `<w:p>` paragraph, one paragraph per line.
fn docx_paragraphs(xml: &[u8]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"tab" => out.push('\t'),
                b"br" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"p" => out.push('\n'),
                b"tab" => out.push('\t'),
                b"br" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Docx(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}
