use std::io::{Cursor, Read};
use std::path::Path;
use log::info;
use quick_xml::events::Event;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::Reader;
use zip::ZipArchive;
use crate::errors::AppError;
use crate::models::user_session::JournalEntry;

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    WordDocument,
}

impl DocumentKind {
    /// Picks the reader from the file extension, falling back to the content type.
    pub fn detect(file_name: &str, content_type: Option<&str>) -> Result<Self, AppError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("txt") | Some("text") | Some("md") => return Ok(DocumentKind::PlainText),
            Some("docx") => return Ok(DocumentKind::WordDocument),
            Some(_) => return Err(AppError::UnsupportedFileType(file_name.to_string())),
            None => {}
        }

        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());
        match mime.as_deref() {
            Some("text/plain") | Some("text/markdown") => Ok(DocumentKind::PlainText),
            Some(DOCX_MIME) => Ok(DocumentKind::WordDocument),
            _ => Err(AppError::UnsupportedFileType(file_name.to_string())),
        }
    }
}

/// Reads an uploaded journal entry into plain text.
pub fn extract_text(file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> Result<JournalEntry, AppError> {
    let kind = DocumentKind::detect(file_name, content_type)?;
    let text = match kind {
        DocumentKind::PlainText => read_plain_text(bytes)?,
        DocumentKind::WordDocument => read_word_document(bytes)?,
    };

    let content = text.trim_end().to_string();
    if content.trim().is_empty() {
        return Err(AppError::EmptyDocument);
    }

    info!("Extracted {} characters from {} ({:?})", content.chars().count(), file_name, kind);
    Ok(JournalEntry {
        file_name: file_name.to_string(),
        content,
    })
}

fn read_plain_text(bytes: &[u8]) -> Result<String, AppError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec())
        .map_err(|_| AppError::InvalidDocument("text file is not valid UTF-8".to_string()))
}

fn read_word_document(bytes: &[u8]) -> Result<String, AppError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)?
        .read_to_string(&mut xml)
        .map_err(|e| AppError::InvalidDocument(format!("{}: {}", DOCUMENT_PART, e)))?;

    Ok(paragraphs_from_xml(&xml)?.join("\n"))
}

/// Collects the text of every `w:p` paragraph in document order.
///
/// Paragraphs nested inside another one (text boxes) are emitted when they
/// close, before the paragraph that contains them.
pub fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, AppError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => open.push(String::new()),
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    if let Some(paragraph) = open.pop() {
                        paragraphs.push(paragraph);
                    }
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" => push_text(&mut open, "\t"),
                b"w:br" | b"w:cr" => push_text(&mut open, "\n"),
                _ => {}
            },
            Event::Text(t) if in_text => {
                push_text(&mut open, &String::from_utf8_lossy(&t));
            }
            Event::GeneralRef(r) if in_text => {
                if let Some(ch) = r.resolve_char_ref()? {
                    push_text(&mut open, ch.encode_utf8(&mut [0u8; 4]));
                } else {
                    let name = String::from_utf8_lossy(&r).into_owned();
                    match resolve_predefined_entity(&name) {
                        Some(value) => push_text(&mut open, value),
                        None => {
                            return Err(AppError::InvalidDocument(format!("unknown entity &{};", name)))
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

// Text goes to the innermost open paragraph
fn push_text(open: &mut [String], text: &str) {
    if let Some(paragraph) = open.last_mut() {
        paragraph.push_str(text);
    }
}
