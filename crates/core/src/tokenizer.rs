use crate::error::IngestError;
use std::path::Path;

pub type TokenSpan = std::ops::Range<usize>;

pub trait TextTokenizer {
    fn id(&self) -> String;

    fn token_spans(&self, text: &str) -> Result<Vec<TokenSpan>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenizer;

impl TextTokenizer for WhitespaceTokenizer {
    fn id(&self) -> String {
        "whitespace".to_string()
    }

    fn token_spans(&self, text: &str) -> Result<Vec<TokenSpan>, IngestError> {
        let mut spans = Vec::new();
        let mut start = None;

        for (offset, ch) in text.char_indices() {
            match (ch.is_whitespace(), start) {
                (true, Some(begin)) => {
                    spans.push(begin..offset);
                    start = None;
                }
                (false, None) => start = Some(offset),
                _ => {}
            }
        }

        if let Some(begin) = start {
            spans.push(begin..text.len());
        }

        Ok(spans)
    }
}

pub struct HuggingFaceTokenizer {
    inner: tokenizers::Tokenizer,
    source: String,
}

impl HuggingFaceTokenizer {
    pub fn from_file(path: &Path) -> Result<Self, IngestError> {
        let mut inner = tokenizers::Tokenizer::from_file(path).map_err(|error| {
            IngestError::Tokenizer(format!("failed to load {}: {error}", path.display()))
        })?;

        // Chunk windows need every token of the document.
        inner.with_truncation(None).map_err(|error| {
            IngestError::Tokenizer(format!("failed to disable truncation: {error}"))
        })?;
        inner.with_padding(None);

        Ok(Self {
            inner,
            source: path.to_string_lossy().to_string(),
        })
    }
}

impl TextTokenizer for HuggingFaceTokenizer {
    fn id(&self) -> String {
        format!("huggingface:{}", self.source)
    }

    fn token_spans(&self, text: &str) -> Result<Vec<TokenSpan>, IngestError> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|error| IngestError::Tokenizer(error.to_string()))?;

        Ok(encoding
            .get_offsets()
            .iter()
            .filter(|(start, end)| end > start)
            .map(|(start, end)| *start..*end)
            .collect())
    }
}
