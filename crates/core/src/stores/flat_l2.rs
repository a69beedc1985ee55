use crate::cache::write_atomic;
use crate::embeddings::check_dimensions;
use crate::traits::VectorIndex;
use crate::{ScoredChunk, SearchError};
use std::fs;
use std::path::Path;

const MAGIC: &[u8; 8] = b"DQAFLAT1";
const HEADER_LEN: usize = MAGIC.len() + 16;

/// Exact nearest-neighbor index: every query is compared against every
/// stored vector. Distances are squared L2; ties keep ascending id order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            data: Vec::new(),
        }
    }

    pub fn build(dimensions: usize, vectors: &[Vec<f32>]) -> Result<Self, SearchError> {
        let mut index = Self::new(dimensions);
        index.add(vectors)?;
        Ok(index)
    }

    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), SearchError> {
        for vector in vectors {
            check_dimensions(self.dimensions, vector)?;
        }
        self.data.reserve(vectors.len() * self.dimensions);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    pub fn vector(&self, id: usize) -> Option<&[f32]> {
        let start = id.checked_mul(self.dimensions)?;
        self.data.get(start..start + self.dimensions)
    }

    pub fn load(path: &Path) -> Result<Self, SearchError> {
        let bytes = fs::read(path).map_err(|source| SearchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes).map_err(|details| SearchError::CorruptIndex {
            path: path.to_path_buf(),
            details,
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&(self.dimensions as u64).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for value in &self.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err("missing index header".to_string());
        }

        let dimensions = read_u64(&bytes[8..16]) as usize;
        let rows = read_u64(&bytes[16..24]) as usize;
        if dimensions == 0 {
            return Err("index dimension is zero".to_string());
        }

        let payload = &bytes[HEADER_LEN..];
        let expected = rows
            .checked_mul(dimensions)
            .and_then(|values| values.checked_mul(4))
            .ok_or_else(|| "index header overflows".to_string())?;
        if payload.len() != expected {
            return Err(format!(
                "expected {expected} payload bytes for {rows}x{dimensions}, found {}",
                payload.len()
            ));
        }

        let data = payload
            .chunks_exact(4)
            .map(|quad| f32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]))
            .collect();

        Ok(Self { dimensions, data })
    }
}

impl VectorIndex for FlatL2Index {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }

    fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, SearchError> {
        check_dimensions(self.dimensions, query_vector)?;
        if k == 0 || k > self.len() {
            return Err(SearchError::InvalidTopK {
                requested: k,
                available: self.len(),
            });
        }

        let mut scored = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(chunk_index, row)| ScoredChunk {
                chunk_index,
                distance: squared_l2(row, query_vector),
            })
            .collect::<Vec<_>>();

        // stable: equal distances keep ascending ids
        scored.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        scored.truncate(k);
        Ok(scored)
    }

    fn save(&self, path: &Path) -> Result<(), SearchError> {
        write_atomic(path, &self.to_bytes()).map_err(|source| SearchError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right)
        .map(|(a, b)| {
            let diff = a - b;
            diff * diff
        })
        .sum()
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buffer = [0u8; 8];
    buffer.copy_from_slice(bytes);
    u64::from_le_bytes(buffer)
}
