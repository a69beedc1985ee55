use crate::error::IngestError;
use crate::models::DocumentMetadata;
use lopdf::{Dictionary, Document, Object};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    pub pages: Vec<PageText>,
    pub metadata: DocumentMetadata,
}

pub trait PdfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, IngestError> {
        if !path.is_file() {
            return Err(IngestError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "source pdf not found"),
            ));
        }

        let document = Document::load(path).map_err(|error| IngestError::PdfParse {
            path: path.to_path_buf(),
            details: error.to_string(),
        })?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse {
                    path: path.to_path_buf(),
                    details: format!("page {page_no}: {error}"),
                })?;

            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        Ok(ExtractedDocument {
            pages,
            metadata: read_info_dictionary(&document),
        })
    }
}

pub fn extract_document(path: &Path) -> Result<ExtractedDocument, IngestError> {
    LopdfExtractor.extract(path)
}

fn read_info_dictionary(document: &Document) -> DocumentMetadata {
    let mut metadata = DocumentMetadata::new();

    let info = match document.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => document.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dictionary)) => Some(dictionary),
        _ => None,
    };

    if let Some(info) = info {
        collect_string_entries(info, &mut metadata);
    }

    metadata
}

fn collect_string_entries(info: &Dictionary, metadata: &mut DocumentMetadata) {
    for (key, value) in info.iter() {
        let Object::String(bytes, _) = value else {
            continue;
        };
        let key = metadata_key(&String::from_utf8_lossy(key));
        let value = decode_pdf_string(bytes);
        if !key.is_empty() {
            metadata.insert(key, value);
        }
    }
}

// `CreationDate` -> `creationDate`, `Title` -> `title`
fn metadata_key(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect::<Vec<_>>();
        return String::from_utf16_lossy(&units);
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|byte| *byte as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_pdf_string, metadata_key, LopdfExtractor, PdfExtractor};
    use crate::IngestError;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn metadata_keys_follow_lower_camel_case() {
        assert_eq!(metadata_key("Title"), "title");
        assert_eq!(metadata_key("CreationDate"), "creationDate");
        assert_eq!(metadata_key("ModDate"), "modDate");
    }

    #[test]
    fn utf16_info_strings_are_decoded() {
        let bytes = [0xFE, 0xFF, 0x00, b'Q', 0x00, b'u', 0x00, 0xED];
        assert_eq!(decode_pdf_string(&bytes), "Quí");
        assert_eq!(decode_pdf_string(b"Cervantes"), "Cervantes");
    }

    #[test]
    fn missing_pdf_reports_the_path() {
        let result = LopdfExtractor.extract(std::path::Path::new("/nonexistent/book.pdf"));
        match result {
            Err(IngestError::Io { path, .. }) => {
                assert_eq!(path, std::path::Path::new("/nonexistent/book.pdf"))
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn corrupt_pdf_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        let result = LopdfExtractor.extract(&path);
        assert!(matches!(result, Err(IngestError::PdfParse { .. })));
        Ok(())
    }
}
