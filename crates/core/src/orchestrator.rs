use crate::cache::{
    read_chunks, read_embeddings, remove_artifacts, write_chunks, write_embeddings, CacheManifest,
    CachePaths, ChunkKey, EmbeddingKey, TextKey,
};
use crate::chunking::chunk_text;
use crate::embeddings::{CharacterNgramEmbedder, Embedder};
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::ingest::{digest_file, pdf_to_text, read_metadata};
use crate::retriever::Retriever;
use crate::stores::FlatL2Index;
use crate::tokenizer::{TextTokenizer, WhitespaceTokenizer};
use crate::traits::VectorIndex;
use crate::{
    Answer, DocumentMetadata, IngestError, PipelineError, PipelineOptions, RankedChunk,
    ScoredChunk, SearchError,
};
use std::fs;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SetupStage {
    NeedText,
    NeedChunks,
    NeedEmbeddingsAndIndex,
    Ready,
}

pub struct PipelineComponents {
    pub extractor: Box<dyn PdfExtractor>,
    pub tokenizer: Box<dyn TextTokenizer>,
    pub context_encoder: Box<dyn Embedder>,
    pub question_encoder: Box<dyn Embedder>,
}

impl PipelineComponents {
    pub fn offline(dimensions: usize) -> Self {
        Self {
            extractor: Box::new(LopdfExtractor),
            tokenizer: Box::new(WhitespaceTokenizer),
            context_encoder: Box::new(CharacterNgramEmbedder { dimensions }),
            question_encoder: Box::new(CharacterNgramEmbedder { dimensions }),
        }
    }
}

pub struct Pipeline {
    options: PipelineOptions,
    components: PipelineComponents,
}

struct StageKeys {
    text: TextKey,
    chunks: ChunkKey,
    embeddings: EmbeddingKey,
}

impl Pipeline {
    pub fn new(options: PipelineOptions, components: PipelineComponents) -> Self {
        Self {
            options,
            components,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn prepare(self) -> Result<PipelineContext, PipelineError> {
        let Self {
            options,
            components,
        } = self;

        options.chunking.validate()?;
        let context_dimensions = components.context_encoder.dimensions();
        let question_dimensions = components.question_encoder.dimensions();
        if context_dimensions != question_dimensions {
            return Err(SearchError::DimensionMismatch {
                expected: context_dimensions,
                actual: question_dimensions,
            }
            .into());
        }

        fs::create_dir_all(&options.cache_dir)
            .map_err(|error| PipelineError::io(&options.cache_dir, error))?;
        let paths = CachePaths::in_dir(&options.cache_dir);
        let mut manifest = CacheManifest::load_or_default(&paths.manifest)?;

        let keys = StageKeys {
            text: TextKey {
                source_sha256: digest_file(&options.source_pdf)?,
                cleaning: options.cleaning.clone(),
            },
            chunks: ChunkKey {
                tokenizer: components.tokenizer.id(),
                chunking: options.chunking,
            },
            embeddings: EmbeddingKey {
                context_model: components.context_encoder.model_id(),
                dimensions: context_dimensions,
            },
        };

        let start = first_stale_stage(&manifest, &paths, &keys);
        info!(cache_dir = %options.cache_dir.display(), stage = ?start, "starting setup");
        invalidate_from(start, &mut manifest, &paths)?;

        let mut recomputed = Vec::new();

        let metadata = if start <= SetupStage::NeedText {
            recomputed.push(SetupStage::NeedText);
            let converted = pdf_to_text(
                components.extractor.as_ref(),
                &options.source_pdf,
                &paths.text,
                Some(paths.metadata.as_path()),
                &options.cleaning,
            )?;
            manifest.text = Some(keys.text);
            manifest.save(&paths.manifest)?;
            converted.metadata
        } else {
            debug!(path = %paths.text.display(), "reusing cleaned text");
            read_metadata(&paths.metadata)?
        };
        info!(?metadata, "document metadata");

        let chunks = if start <= SetupStage::NeedChunks {
            recomputed.push(SetupStage::NeedChunks);
            let text = fs::read_to_string(&paths.text)
                .map_err(|error| IngestError::io(&paths.text, error))?;
            let chunks = chunk_text(&text, components.tokenizer.as_ref(), options.chunking)?;
            write_chunks(&paths.chunks, &chunks)?;
            manifest.chunks = Some(keys.chunks);
            manifest.save(&paths.manifest)?;
            info!(count = chunks.len(), "chunked cleaned text");
            chunks
        } else {
            let chunks = read_chunks(&paths.chunks)?;
            info!(count = chunks.len(), "loaded cached chunks");
            chunks
        };

        let mut index_build_time = Duration::ZERO;
        let (embeddings, index) = if start <= SetupStage::NeedEmbeddingsAndIndex {
            recomputed.push(SetupStage::NeedEmbeddingsAndIndex);
            let started = Instant::now();
            let vectors = components.context_encoder.encode(
                &chunks,
                options.encode.batch_size,
                options.encode.max_length,
            )?;
            write_embeddings(&paths.embeddings, context_dimensions, &vectors)?;
            let index = FlatL2Index::build(context_dimensions, &vectors)?;
            index.save(&paths.index)?;
            index_build_time = started.elapsed();

            manifest.embeddings = Some(keys.embeddings);
            manifest.save(&paths.manifest)?;
            info!(
                vectors = index.len(),
                seconds = index_build_time.as_secs_f64(),
                "built embeddings and index"
            );
            (vectors, index)
        } else {
            let (_, vectors) = read_embeddings(&paths.embeddings)?;
            let index = FlatL2Index::load(&paths.index)?;
            info!(vectors = index.len(), "loaded cached embeddings and index");
            (vectors, index)
        };

        check_consistency(&chunks, &embeddings, &index, question_dimensions)?;

        Ok(PipelineContext {
            chunks,
            metadata,
            question_encoder: components.question_encoder,
            index,
            index_build_time,
            max_length: options.encode.max_length,
            recomputed,
        })
    }
}

fn first_stale_stage(manifest: &CacheManifest, paths: &CachePaths, keys: &StageKeys) -> SetupStage {
    if manifest.text.as_ref() != Some(&keys.text) || !paths.text.is_file() {
        return SetupStage::NeedText;
    }
    if manifest.chunks.as_ref() != Some(&keys.chunks) || !paths.chunks.is_file() {
        return SetupStage::NeedChunks;
    }
    if manifest.embeddings.as_ref() != Some(&keys.embeddings)
        || !paths.embeddings.is_file()
        || !paths.index.is_file()
    {
        return SetupStage::NeedEmbeddingsAndIndex;
    }
    SetupStage::Ready
}

fn invalidate_from(
    start: SetupStage,
    manifest: &mut CacheManifest,
    paths: &CachePaths,
) -> Result<(), PipelineError> {
    if start == SetupStage::Ready {
        return Ok(());
    }

    if start <= SetupStage::NeedText && manifest.text.take().is_some() {
        warn!("source pdf or cleaning options changed, discarding cached text");
    }
    if start <= SetupStage::NeedChunks && manifest.chunks.take().is_some() {
        warn!("chunking inputs changed, discarding cached chunks");
    }
    if manifest.embeddings.take().is_some() {
        warn!("embedding inputs changed, discarding cached embeddings and index");
    }
    manifest.save(&paths.manifest)?;

    let mut stale = vec![paths.embeddings.as_path(), paths.index.as_path()];
    if start <= SetupStage::NeedChunks {
        stale.push(paths.chunks.as_path());
    }
    if start <= SetupStage::NeedText {
        stale.push(paths.text.as_path());
        stale.push(paths.metadata.as_path());
    }
    remove_artifacts(&stale)
}

fn check_consistency(
    chunks: &[String],
    embeddings: &[Vec<f32>],
    index: &FlatL2Index,
    question_dimensions: usize,
) -> Result<(), PipelineError> {
    if chunks.len() != embeddings.len() || chunks.len() != index.len() {
        return Err(PipelineError::CacheInconsistency {
            chunks: chunks.len(),
            embeddings: embeddings.len(),
            indexed: index.len(),
        });
    }

    if index.dimensions() != question_dimensions {
        return Err(SearchError::DimensionMismatch {
            expected: index.dimensions(),
            actual: question_dimensions,
        }
        .into());
    }

    if let Some(row) = embeddings.iter().find(|row| row.len() != index.dimensions()) {
        return Err(SearchError::DimensionMismatch {
            expected: index.dimensions(),
            actual: row.len(),
        }
        .into());
    }

    Ok(())
}

pub struct PipelineContext {
    chunks: Vec<String>,
    metadata: DocumentMetadata,
    question_encoder: Box<dyn Embedder>,
    index: FlatL2Index,
    index_build_time: Duration,
    max_length: usize,
    recomputed: Vec<SetupStage>,
}

impl PipelineContext {
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    pub fn index(&self) -> &FlatL2Index {
        &self.index
    }

    pub fn question_encoder(&self) -> &dyn Embedder {
        self.question_encoder.as_ref()
    }

    pub fn index_build_time(&self) -> Duration {
        self.index_build_time
    }

    pub fn recomputed_stages(&self) -> &[SetupStage] {
        &self.recomputed
    }

    pub fn retrieve(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>, SearchError> {
        Retriever::new(self.question_encoder.as_ref(), &self.index, self.max_length)
            .retrieve(question, k)
    }

    pub fn answer(&self, question: &str, k: usize) -> Result<Answer, PipelineError> {
        let started = Instant::now();
        let scored = self.retrieve(question, k)?;
        let retrieval_time = started.elapsed();

        let hits = scored
            .into_iter()
            .enumerate()
            .map(|(position, hit)| {
                let text = self.chunks.get(hit.chunk_index).ok_or_else(|| {
                    PipelineError::CacheInconsistency {
                        chunks: self.chunks.len(),
                        embeddings: self.index.len(),
                        indexed: self.index.len(),
                    }
                })?;
                Ok(RankedChunk {
                    rank: position + 1,
                    chunk_index: hit.chunk_index,
                    text: text.clone(),
                    distance: hit.distance,
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        debug!(question, hits = hits.len(), "answered question");

        Ok(Answer {
            question: question.to_string(),
            hits,
            retrieval_time,
            index_build_time: self.index_build_time,
        })
    }
}
