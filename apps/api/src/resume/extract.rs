//! Text Extractor — résumé bytes in, plain text out.
//!
//! Only the allow-listed formats are parsed. Anything else is rejected before a parser
//! is touched. Extraction is pure: no I/O beyond reading the given bytes.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Path of the main body part inside a DOCX package.
const DOCX_BODY: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse document: {0}")]
    Parse(String),
}

/// Résumé formats the extractor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    Pdf,
    Docx,
}

impl ResumeFormat {
    /// Case-insensitive lookup against the allow-list.
    pub fn from_extension(extension: &str) -> Result<Self, ExtractError> {
        match extension.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ResumeFormat::Pdf),
            "docx" => Ok(ResumeFormat::Docx),
            other => Err(ExtractError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Uses whatever follows the last `.` of the file name.
    pub fn from_file_name(file_name: &str) -> Result<Self, ExtractError> {
        let extension = file_name.rsplit('.').next().unwrap_or_default();
        Self::from_extension(extension)
    }

    pub fn extension(self) -> &'static str {
        match self {
            ResumeFormat::Pdf => "pdf",
            ResumeFormat::Docx => "docx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ResumeFormat::Pdf => "application/pdf",
            ResumeFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn extract(self, bytes: &[u8]) -> Result<String, ExtractError> {
        match self {
            ResumeFormat::Pdf => extract_pdf(bytes),
            ResumeFormat::Docx => extract_docx(bytes),
        }
    }
}

/// Extracts text from `bytes` declared as `extension`.
pub fn extract(bytes: &[u8], extension: &str) -> Result<String, ExtractError> {
    ResumeFormat::from_extension(extension)?.extract(bytes)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract can panic on malformed streams; a bad upload must not take the worker down.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractError::Parse(format!("unreadable PDF: {e:?}"))),
        Err(_) => Err(ExtractError::Parse(
            "PDF parser aborted on malformed input".to_string(),
        )),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::Parse(format!("not a DOCX package: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| ExtractError::Parse(format!("missing {DOCX_BODY}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Parse(format!("unreadable {DOCX_BODY}: {e}")))?;

    document_text(&xml)
}

/// Walks WordprocessingML and keeps run text. Paragraphs end with a blank line.
fn document_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"p" => text.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" if in_run => text.push('\t'),
                b"br" | b"cr" if in_run => text.push('\n'),
                b"p" => text.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let raw = String::from_utf8_lossy(&t).into_owned();
                match quick_xml::escape::unescape(&raw) {
                    Ok(unescaped) => text.push_str(&unescaped),
                    Err(_) => text.push_str(&raw),
                }
            }
            Ok(Event::GeneralRef(r)) if in_text => {
                if let Some(resolved) = resolve_reference(&String::from_utf8_lossy(&r)) {
                    text.push_str(&resolved);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Parse(format!("malformed document XML: {e}"))),
            _ => {}
        }
    }

    Ok(text.trim_end().to_string())
}

/// Resolves `#NN`, `#xHH` and the five predefined XML entities.
fn resolve_reference(name: &str) -> Option<String> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    let resolved = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        _ => return None,
    };
    Some(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(DOCX_BODY, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    /// Single-page PDF with one line of Helvetica text and a correct xref table.
    fn pdf_with_text(text: &str) -> Vec<u8> {
        let content = format!("BT /F1 24 Tf 72 720 Td ({text}) Tj ET");
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>".to_string(),
            format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
        }

        let xref_at = pdf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        pdf.extend_from_slice(xref.as_bytes());
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
                objects.len() + 1
            )
            .as_bytes(),
        );
        pdf
    }

    #[test]
    fn test_well_formed_pdf_yields_its_text() {
        let bytes = pdf_with_text("Jane Doe Rust Engineer");
        let text = extract(&bytes, "pdf").unwrap();
        assert!(text.contains("Jane Doe"), "got {text:?}");
        assert!(!text.trim().is_empty());
    }

    #[test]
    fn test_txt_is_unsupported_regardless_of_content() {
        for bytes in [&b"%PDF-1.7 looks like a pdf"[..], b"plain words", b""] {
            let err = extract(bytes, "txt").unwrap_err();
            assert!(matches!(err, ExtractError::UnsupportedFormat(ref ext) if ext == "txt"));
        }
    }

    #[test]
    fn test_unknown_extensions_are_unsupported() {
        for ext in ["doc", "rtf", "", "pdf.exe"] {
            assert!(matches!(
                extract(b"anything", ext),
                Err(ExtractError::UnsupportedFormat(_))
            ));
        }
    }

    #[test]
    fn test_extension_lookup_is_case_insensitive() {
        assert_eq!(ResumeFormat::from_extension("PDF").unwrap(), ResumeFormat::Pdf);
        assert_eq!(ResumeFormat::from_extension("DocX").unwrap(), ResumeFormat::Docx);
    }

    #[test]
    fn test_format_from_file_name_uses_last_segment() {
        assert_eq!(
            ResumeFormat::from_file_name("jane.doe.resume.DOCX").unwrap(),
            ResumeFormat::Docx
        );
        assert!(ResumeFormat::from_file_name("resume").is_err());
        assert!(ResumeFormat::from_file_name("resume.pdf.txt").is_err());
    }

    #[test]
    fn test_corrupt_pdf_is_parse_error() {
        let err = extract(b"definitely not a pdf", "pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }

    #[test]
    fn test_docx_paragraphs_and_runs() {
        let bytes = docx_with_body(
            r#"<w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p><w:p><w:r><w:t xml:space="preserve">Rust </w:t></w:r><w:r><w:t>engineer</w:t></w:r></w:p>"#,
        );
        let text = extract(&bytes, "docx").unwrap();
        assert_eq!(text, "Jane Doe\n\nRust engineer");
    }

    #[test]
    fn test_docx_tabs_breaks_and_entities() {
        let bytes = docx_with_body(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>R&amp;D</w:t><w:tab/><w:t>2019&#8211;2024</w:t><w:br/><w:t>Lead</w:t></w:r></w:p>"#,
        );
        let text = extract(&bytes, "docx").unwrap();
        assert_eq!(text, "R&D\t2019\u{2013}2024\nLead");
    }

    #[test]
    fn test_docx_without_body_is_parse_error() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/styles.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<w:styles/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        assert!(matches!(extract(&bytes, "docx"), Err(ExtractError::Parse(_))));
    }

    #[test]
    fn test_non_zip_docx_is_parse_error() {
        assert!(matches!(
            extract(b"PK but not really", "docx"),
            Err(ExtractError::Parse(_))
        ));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let bytes = docx_with_body(r#"<w:p><w:r><w:t>Same</w:t></w:r></w:p>"#);
        assert_eq!(extract(&bytes, "docx").unwrap(), extract(&bytes, "docx").unwrap());
    }

    #[test]
    fn test_resolve_reference() {
        assert_eq!(resolve_reference("amp").as_deref(), Some("&"));
        assert_eq!(resolve_reference("#65").as_deref(), Some("A"));
        assert_eq!(resolve_reference("#x41").as_deref(), Some("A"));
        assert_eq!(resolve_reference("nbsp"), None);
    }
}
