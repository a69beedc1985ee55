use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TOP_K: usize = 5;

pub type DocumentMetadata = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CleaningOptions {
    pub line_sep: String,
    pub cleanup_hyphens: bool,
    pub normalize_whitespace: bool,
    pub remove_headers_footers: bool,
    pub hf_lines: usize,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            line_sep: "\n".to_string(),
            cleanup_hyphens: true,
            normalize_whitespace: true,
            remove_headers_footers: true,
            hf_lines: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 200,
            overlap: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeOptions {
    pub batch_size: usize,
    pub max_length: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            batch_size: 32,
            max_length: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub source_pdf: PathBuf,
    pub cache_dir: PathBuf,
    pub cleaning: CleaningOptions,
    pub chunking: ChunkingConfig,
    pub encode: EncodeOptions,
}

impl PipelineOptions {
    pub fn new(source_pdf: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_pdf: source_pdf.into(),
            cache_dir: cache_dir.into(),
            cleaning: CleaningOptions::default(),
            chunking: ChunkingConfig::default(),
            encode: EncodeOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_index: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedChunk {
    pub rank: usize,
    pub chunk_index: usize,
    pub text: String,
    pub distance: f32,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub question: String,
    pub hits: Vec<RankedChunk>,
    pub retrieval_time: Duration,
    pub index_build_time: Duration,
}
