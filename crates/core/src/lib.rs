pub mod cache;
pub mod chunking;
pub mod cleaning;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod remote;
pub mod retriever;
pub mod stores;
pub mod tokenizer;
pub mod traits;

pub use cache::{write_atomic, CacheManifest, CachePaths};
pub use chunking::{chunk_text, read_and_chunk_text, window_bounds};
pub use cleaning::{detect_repeated_lines, RepeatedLines, TextCleaner};
pub use embeddings::{CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, PipelineError, SearchError};
pub use extractor::{extract_document, ExtractedDocument, LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{digest_file, pdf_to_text, read_metadata, ConvertedDocument};
pub use models::{
    Answer, ChunkingConfig, CleaningOptions, DocumentMetadata, EncodeOptions, PipelineOptions,
    RankedChunk, ScoredChunk, DEFAULT_TOP_K,
};
pub use orchestrator::{Pipeline, PipelineComponents, PipelineContext, SetupStage};
pub use remote::{EmbeddingEndpointConfig, HttpEmbedder};
pub use retriever::Retriever;
pub use stores::FlatL2Index;
pub use tokenizer::{HuggingFaceTokenizer, TextTokenizer, TokenSpan, WhitespaceTokenizer};
pub use traits::VectorIndex;
