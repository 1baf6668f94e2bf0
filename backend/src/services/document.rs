//! Turns uploaded files into something the formatter can read.

use std::io::{Cursor, Read};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;

/// Content handed to the AI formatter.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentContent {
    Text(String),
    /// PDF bytes, forwarded to Gemini as inline data.
    Pdf(Vec<u8>),
}

impl DocumentContent {
    /// Bytes used for cache keys and interaction logging.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            DocumentContent::Text(text) => text.as_bytes(),
            DocumentContent::Pdf(bytes) => bytes,
        }
    }
}

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank line regex"));

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Picks the extraction path from the file extension, falling back to the
/// declared content type.
pub fn extract(
    filename: &str,
    content_type: Option<&str>,
    bytes: Vec<u8>,
) -> Result<DocumentContent, AppError> {
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match (extension.as_str(), content_type) {
        ("pdf", _) | (_, Some("application/pdf")) => {
            if !bytes.starts_with(b"%PDF") {
                return Err(AppError::BadRequest("File is not a valid PDF".to_string()));
            }
            Ok(DocumentContent::Pdf(bytes))
        }
        ("docx", _) | (_, Some(DOCX_MIME)) => docx_text(&bytes).map(DocumentContent::Text),
        ("txt", _) | ("md", _) | (_, Some("text/plain")) | (_, Some("text/markdown")) => {
            String::from_utf8(bytes)
                .map(DocumentContent::Text)
                .map_err(|_| AppError::BadRequest("Text file is not valid UTF-8".to_string()))
        }
        _ => Err(AppError::BadRequest(
            "Unsupported file type. Upload a PDF, DOCX or TXT file.".to_string(),
        )),
    }
}

/// Upper bound on the decompressed `word/document.xml`.
pub const MAX_DOCX_XML_BYTES: usize = 20 * 1024 * 1024;

/// Reads `word/document.xml` from the DOCX container and flattens it to text,
/// one paragraph per line.
pub fn docx_text(bytes: &[u8]) -> Result<String, AppError> {
    docx_text_limited(bytes, MAX_DOCX_XML_BYTES)
}

fn docx_text_limited(bytes: &[u8], max_xml_bytes: usize) -> Result<String, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AppError::BadRequest(format!("Invalid DOCX file: {}", e)))?;

    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| AppError::BadRequest("DOCX file has no document body".to_string()))?;

    // Compressed size says nothing about the expanded size.
    let mut raw = Vec::new();
    entry
        .take(max_xml_bytes as u64 + 1)
        .read_to_end(&mut raw)
        .map_err(|e| AppError::BadRequest(format!("Unreadable DOCX body: {}", e)))?;

    if raw.len() > max_xml_bytes {
        return Err(AppError::PayloadTooLarge(
            "DOCX document body is too large".to_string(),
        ));
    }

    let xml = String::from_utf8(raw)
        .map_err(|_| AppError::BadRequest("DOCX body is not valid UTF-8".to_string()))?;

    Ok(docx_xml_to_text(&xml))
}

fn docx_xml_to_text(xml: &str) -> String {
    let marked = xml
        .replace("</w:p>", "\n")
        .replace("<w:br/>", "\n")
        .replace("<w:tab/>", "\t");
    let stripped = TAG_RE.replace_all(&marked, "");
    let decoded = html_escape::decode_html_entities(&stripped);
    BLANK_LINES_RE
        .replace_all(decoded.trim(), "\n\n")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn docx_with_body(xml: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("word/document.xml", zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let xml = r#"<w:document><w:body><w:p><w:r><w:t>1. A ball falls &amp; bounces.</w:t></w:r></w:p><w:p><w:r><w:t>a)</w:t><w:tab/><w:t>2 m/s</w:t></w:r></w:p></w:body></w:document>"#;
        let text = docx_text(&docx_with_body(xml)).unwrap();
        assert_eq!(text, "1. A ball falls & bounces.\na)\t2 m/s");
    }

    #[test]
    fn oversized_docx_body_is_rejected() {
        let body = format!("<w:p><w:t>{}</w:t></w:p>", "x".repeat(4096));
        let docx = docx_with_body(&body);
        assert!(docx.len() < body.len());

        assert!(matches!(
            docx_text_limited(&docx, 1024),
            Err(AppError::PayloadTooLarge(_))
        ));
        assert!(docx_text_limited(&docx, body.len()).is_ok());
    }

    #[test]
    fn extension_selects_extractor() {
        let docx = docx_with_body("<w:p><w:t>Hi</w:t></w:p>");
        assert_eq!(
            extract("Lesson.DOCX", None, docx).unwrap(),
            DocumentContent::Text("Hi".to_string())
        );
        assert_eq!(
            extract("notes.txt", None, b"F = ma".to_vec()).unwrap(),
            DocumentContent::Text("F = ma".to_string())
        );
        assert!(matches!(
            extract("exam.pdf", None, b"%PDF-1.7 ...".to_vec()).unwrap(),
            DocumentContent::Pdf(_)
        ));
    }

    #[test]
    fn rejects_unknown_and_broken_files() {
        assert!(extract("image.png", Some("image/png"), vec![1, 2, 3]).is_err());
        assert!(extract("exam.pdf", None, b"not a pdf".to_vec()).is_err());
        assert!(extract("broken.docx", None, b"not a zip".to_vec()).is_err());
        assert!(extract("empty.txt", None, Vec::new()).is_err());
    }
}
