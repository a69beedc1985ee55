use crate::error::IngestError;
use crate::models::ChunkingConfig;
use crate::tokenizer::TextTokenizer;
use std::fs;
use std::path::Path;

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk_size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Token offsets `[start, end)` of every window, in order.
///
/// Windows start every `chunk_size - overlap` tokens; the last window is the
/// first one whose end reaches the token count, so it may be shorter.
pub fn window_bounds(
    token_count: usize,
    config: ChunkingConfig,
) -> Result<Vec<(usize, usize)>, IngestError> {
    config.validate()?;

    let mut windows = Vec::new();
    let mut start = 0;
    while start < token_count {
        let end = (start + config.chunk_size).min(token_count);
        windows.push((start, end));
        if start + config.chunk_size >= token_count {
            break;
        }
        start += config.step();
    }

    Ok(windows)
}

/// Splits `text` into overlapping token windows. Each chunk is the exact
/// substring from its first token's start to its last token's end.
pub fn chunk_text(
    text: &str,
    tokenizer: &dyn TextTokenizer,
    config: ChunkingConfig,
) -> Result<Vec<String>, IngestError> {
    config.validate()?;
    let spans = tokenizer.token_spans(text)?;

    window_bounds(spans.len(), config)?
        .into_iter()
        .map(|(start, end)| {
            let from = spans[start].start;
            let to = spans[end - 1].end;
            text.get(from..to).map(str::to_string).ok_or_else(|| {
                IngestError::Tokenizer(format!(
                    "token span {from}..{to} is not on a character boundary"
                ))
            })
        })
        .collect()
}

pub fn read_and_chunk_text(
    path: &Path,
    tokenizer: &dyn TextTokenizer,
    config: ChunkingConfig,
) -> Result<Vec<String>, IngestError> {
    let text = fs::read_to_string(path).map_err(|error| IngestError::io(path, error))?;
    chunk_text(&text, tokenizer, config)
}
