use std::io::{Cursor, Write};
use chrono::{DateTime, Local};
use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};
use crate::errors::AppError;
use crate::models::message::Message;
use crate::models::user_session::UserSession;

pub const TRANSCRIPT_TITLE: &str = "Reflection Transcript";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// One `"<Label>: <content>"` line per message, in session order.
pub fn transcript_lines(history: &[Message]) -> Vec<String> {
    history.iter().map(|message| message.to_string()).collect()
}

pub fn file_name(generated_at: &DateTime<Local>) -> String {
    format!("reflection-transcript-{}.docx", generated_at.format("%Y%m%d-%H%M%S"))
}

/// Renders the session transcript as a `.docx` package.
pub fn render_docx(session: &UserSession, generated_at: &DateTime<Local>) -> Result<Vec<u8>, AppError> {
    let document_xml = document_xml(session, generated_at);

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        ("_rels/.rels", RELS_XML),
        ("word/document.xml", document_xml.as_str()),
    ] {
        writer
            .start_file(name, options)
            .map_err(|e| AppError::Export(e.to_string()))?;
        writer
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::Export(e.to_string()))?;
    }

    let cursor = writer.finish().map_err(|e| AppError::Export(e.to_string()))?;
    Ok(cursor.into_inner())
}

fn document_xml(session: &UserSession, generated_at: &DateTime<Local>) -> String {
    let mut body = String::new();
    body.push_str(&heading(TRANSCRIPT_TITLE));

    let mut source = format!("Exported {}", generated_at.format("%Y-%m-%d %H:%M"));
    if let Some(entry) = &session.document {
        source = format!("Journal entry: {} | {}", entry.file_name, source);
    }
    body.push_str(&paragraph(None, &source));

    for message in &session.history {
        body.push_str(&paragraph(Some(message.role.label()), &message.content));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        body
    )
}

fn heading(text: &str) -> String {
    format!(
        r#"<w:p><w:r><w:rPr><w:b/><w:sz w:val="32"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape(text)
    )
}

// Bold "Label: " run, then the content with line breaks kept
fn paragraph(label: Option<&str>, content: &str) -> String {
    let mut xml = String::from("<w:p>");
    if let Some(label) = label {
        xml.push_str(&format!(
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}: </w:t></w:r>"#,
            escape(label)
        ));
    }

    xml.push_str("<w:r>");
    for (i, line) in content.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if i > 0 {
            xml.push_str("<w:br/>");
        }
        xml.push_str(&format!(r#"<w:t xml:space="preserve">{}</w:t>"#, escape(line)));
    }
    xml.push_str("</w:r></w:p>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::models::user_session::JournalEntry;
    use crate::services::document_service::{extract_text, paragraphs_from_xml};

    fn timestamp() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    fn session() -> UserSession {
        let mut session = UserSession::default();
        session.load_document(JournalEntry {
            file_name: "week1.txt".to_string(),
            content: "Group project went badly".to_string(),
        });
        session.push(Message::user("I want to talk about the group project"));
        session.push(Message::assistant("What part of it stayed with you?\nTake your time."));
        session.push(Message::user("When Sam & I <disagreed>"));
        session
    }

    #[test]
    fn test_transcript_lines_keep_order_and_labels() {
        let lines = transcript_lines(&session().history);
        assert_eq!(
            lines,
            vec![
                "User: I want to talk about the group project",
                "Assistant: What part of it stayed with you?\nTake your time.",
                "User: When Sam & I <disagreed>",
            ]
        );
    }

    #[test]
    fn test_document_escapes_and_orders_messages() {
        let paragraphs = paragraphs_from_xml(&document_xml(&session(), &timestamp())).unwrap();
        assert_eq!(paragraphs[0], TRANSCRIPT_TITLE);
        assert_eq!(paragraphs[1], "Journal entry: week1.txt | Exported 2026-03-14 09:26");
        assert_eq!(&paragraphs[2..], transcript_lines(&session().history).as_slice());
    }

    #[test]
    fn test_exported_docx_reads_back() {
        let bytes = render_docx(&session(), &timestamp()).unwrap();
        let entry = extract_text("transcript.docx", None, &bytes).unwrap();
        let expected = transcript_lines(&session().history).join("\n");
        assert!(entry.content.ends_with(&expected), "unexpected transcript: {}", entry.content);
    }

    #[test]
    fn test_empty_session_exports_title_only() {
        let bytes = render_docx(&UserSession::default(), &timestamp()).unwrap();
        let entry = extract_text("transcript.docx", None, &bytes).unwrap();
        assert_eq!(entry.content, "Reflection Transcript\nExported 2026-03-14 09:26");
    }

    #[test]
    fn test_blank_lines_in_messages_are_kept() {
        let mut session = UserSession::default();
        session.push(Message::user("First thought\r\n\nSecond thought\n\n"));
        let paragraphs = paragraphs_from_xml(&document_xml(&session, &timestamp())).unwrap();
        assert_eq!(paragraphs[2], "User: First thought\n\nSecond thought\n\n");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(&timestamp()), "reflection-transcript-20260314-092653.docx");
    }
}
