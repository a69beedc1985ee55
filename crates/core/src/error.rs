use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pdf parse error in {}: {details}", .path.display())]
    PdfParse { path: PathBuf, details: String },

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IngestError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid top_k {requested}: index holds {available} vectors")]
    InvalidTopK { requested: usize, available: usize },

    #[error("query is empty")]
    EmptyQuery,

    #[error("embedding dimension {actual} does not match expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("encoder failed: {0}")]
    Model(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("corrupt index file {}: {details}", .path.display())]
    CorruptIndex { path: PathBuf, details: String },

    #[error("index io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(
        "cache inconsistency: {chunks} chunks, {embeddings} embeddings, {indexed} indexed vectors"
    )]
    CacheInconsistency {
        chunks: usize,
        embeddings: usize,
        indexed: usize,
    },

    #[error("corrupt cache file {}: {details}", .path.display())]
    CorruptCache { path: PathBuf, details: String },

    #[error("cache io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
