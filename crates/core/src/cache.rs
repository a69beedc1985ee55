use crate::error::PipelineError;
use crate::models::{ChunkingConfig, CleaningOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const EMBEDDINGS_MAGIC: &[u8; 8] = b"DQAEMB01";
const EMBEDDINGS_HEADER_LEN: usize = EMBEDDINGS_MAGIC.len() + 16;

pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    pub text: PathBuf,
    pub metadata: PathBuf,
    pub chunks: PathBuf,
    pub embeddings: PathBuf,
    pub index: PathBuf,
    pub manifest: PathBuf,
}

impl CachePaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            text: dir.join("cleaned.txt"),
            metadata: dir.join("metadata.json"),
            chunks: dir.join("chunks.jsonl"),
            embeddings: dir.join("embeddings.bin"),
            index: dir.join("chunks.index"),
            manifest: dir.join("manifest.json"),
        }
    }
}

pub fn remove_artifacts(paths: &[&Path]) -> Result<(), PipelineError> {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => return Err(PipelineError::io(*path, error)),
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheManifest {
    pub text: Option<TextKey>,
    pub chunks: Option<ChunkKey>,
    pub embeddings: Option<EmbeddingKey>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextKey {
    pub source_sha256: String,
    pub cleaning: CleaningOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkKey {
    pub tokenizer: String,
    pub chunking: ChunkingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingKey {
    pub context_model: String,
    pub dimensions: usize,
}

impl Default for CacheManifest {
    fn default() -> Self {
        Self {
            text: None,
            chunks: None,
            embeddings: None,
            updated_at: Utc::now(),
        }
    }
}

impl CacheManifest {
    /// A missing or malformed manifest trusts nothing; any other read failure is an error.
    pub fn load_or_default(path: &Path) -> Result<Self, PipelineError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(error) => return Err(PipelineError::io(path, error)),
        };

        match serde_json::from_slice(&bytes) {
            Ok(manifest) => Ok(manifest),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "ignoring malformed cache manifest");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&mut self, path: &Path) -> Result<(), PipelineError> {
        self.updated_at = Utc::now();
        let bytes = serde_json::to_vec_pretty(self).map_err(|error| PipelineError::CorruptCache {
            path: path.to_path_buf(),
            details: error.to_string(),
        })?;
        write_atomic(path, &bytes).map_err(|error| PipelineError::io(path, error))
    }
}

pub fn write_chunks(path: &Path, chunks: &[String]) -> Result<(), PipelineError> {
    let mut buffer = Vec::new();
    for chunk in chunks {
        serde_json::to_writer(&mut buffer, chunk).map_err(|error| PipelineError::CorruptCache {
            path: path.to_path_buf(),
            details: error.to_string(),
        })?;
        buffer.push(b'\n');
    }
    write_atomic(path, &buffer).map_err(|error| PipelineError::io(path, error))
}

pub fn read_chunks(path: &Path) -> Result<Vec<String>, PipelineError> {
    let content = fs::read_to_string(path).map_err(|error| PipelineError::io(path, error))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_no, line)| {
            serde_json::from_str::<String>(line).map_err(|error| PipelineError::CorruptCache {
                path: path.to_path_buf(),
                details: format!("line {}: {error}", line_no + 1),
            })
        })
        .collect()
}

pub fn write_embeddings(
    path: &Path,
    dimensions: usize,
    vectors: &[Vec<f32>],
) -> Result<(), PipelineError> {
    let mut bytes = Vec::with_capacity(EMBEDDINGS_HEADER_LEN + vectors.len() * dimensions * 4);
    bytes.extend_from_slice(EMBEDDINGS_MAGIC);
    bytes.extend_from_slice(&(vectors.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&(dimensions as u64).to_le_bytes());

    for (row, vector) in vectors.iter().enumerate() {
        if vector.len() != dimensions {
            return Err(PipelineError::CorruptCache {
                path: path.to_path_buf(),
                details: format!("row {row} has {} values, expected {dimensions}", vector.len()),
            });
        }
        for value in vector {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }

    write_atomic(path, &bytes).map_err(|error| PipelineError::io(path, error))
}

pub fn read_embeddings(path: &Path) -> Result<(usize, Vec<Vec<f32>>), PipelineError> {
    let bytes = fs::read(path).map_err(|error| PipelineError::io(path, error))?;
    let corrupt = |details: String| PipelineError::CorruptCache {
        path: path.to_path_buf(),
        details,
    };

    if bytes.len() < EMBEDDINGS_HEADER_LEN || &bytes[..EMBEDDINGS_MAGIC.len()] != EMBEDDINGS_MAGIC {
        return Err(corrupt("missing embeddings header".to_string()));
    }

    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[8..16]);
    let rows = u64::from_le_bytes(word) as usize;
    word.copy_from_slice(&bytes[16..24]);
    let dimensions = u64::from_le_bytes(word) as usize;

    let payload = &bytes[EMBEDDINGS_HEADER_LEN..];
    let expected = rows
        .checked_mul(dimensions)
        .and_then(|values| values.checked_mul(4));
    if dimensions == 0 || expected != Some(payload.len()) {
        return Err(corrupt(format!(
            "header says {rows}x{dimensions}, payload has {} bytes",
            payload.len()
        )));
    }

    let vectors = payload
        .chunks_exact(dimensions * 4)
        .map(|row| {
            row.chunks_exact(4)
                .map(|quad| f32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]))
                .collect()
        })
        .collect();

    Ok((dimensions, vectors))
}
