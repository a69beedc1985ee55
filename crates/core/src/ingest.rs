use crate::cache::write_atomic;
use crate::cleaning::TextCleaner;
use crate::extractor::PdfExtractor;
use crate::models::{CleaningOptions, DocumentMetadata};
use crate::{IngestError, PipelineError};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::info;

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path).map_err(|error| IngestError::io(path, error))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    pub text: String,
    pub metadata: DocumentMetadata,
    pub page_count: usize,
}

pub fn pdf_to_text(
    extractor: &dyn PdfExtractor,
    pdf_path: &Path,
    txt_path: &Path,
    metadata_path: Option<&Path>,
    options: &CleaningOptions,
) -> Result<ConvertedDocument, IngestError> {
    let cleaner = TextCleaner::new(options.clone())?;
    let document = extractor.extract(pdf_path)?;
    let text = cleaner.clean_document(&document.pages);

    write_atomic(txt_path, text.as_bytes()).map_err(|error| IngestError::io(txt_path, error))?;

    if let Some(metadata_path) = metadata_path {
        let json = serde_json::to_vec_pretty(&document.metadata)?;
        write_atomic(metadata_path, &json).map_err(|error| IngestError::io(metadata_path, error))?;
    }

    info!(
        source = %pdf_path.display(),
        pages = document.pages.len(),
        chars = text.chars().count(),
        "converted pdf to text"
    );

    Ok(ConvertedDocument {
        text,
        metadata: document.metadata,
        page_count: document.pages.len(),
    })
}

pub fn read_metadata(path: &Path) -> Result<DocumentMetadata, PipelineError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Ok(DocumentMetadata::new())
        }
        Err(error) => return Err(PipelineError::io(path, error)),
    };

    serde_json::from_slice(&bytes).map_err(|error| PipelineError::CorruptCache {
        path: path.to_path_buf(),
        details: error.to_string(),
    })
}
